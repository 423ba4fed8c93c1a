use std::process::ExitCode;

use colored::*;

use adshard_common::config::HashAlgorithm;
use adshard_core::hashing::NameDigest;

use crate::terminal::{colors, logging, print};

type Detail = (String, ColoredString);

/// Prints digest and target group for each name. Reads nothing from the
/// directory.
pub fn assign(names: &[String], prefix: &str, algorithm: &str) -> anyhow::Result<ExitCode> {
    let algorithm: HashAlgorithm = algorithm.parse()?;
    if prefix.trim().is_empty() {
        anyhow::bail!("group prefix must not be empty");
    }

    let _guard = logging::init_terminal();
    print::header(&format!("{algorithm} assignment"));

    for (idx, name) in names.iter().enumerate() {
        let digest = NameDigest::compute(algorithm, name);
        print::tree_head(idx, name);
        print::as_tree_one_level(details(&digest, prefix));
    }

    print::fat_separator();
    Ok(ExitCode::SUCCESS)
}

fn details(digest: &NameDigest, prefix: &str) -> Vec<Detail> {
    vec![
        ("Digest".to_string(), digest.as_str().color(colors::DIGEST)),
        ("Group".to_string(), digest.group_for(prefix).color(colors::GROUP).bold()),
    ]
}

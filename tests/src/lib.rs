#![cfg(test)]

mod reconcile;
mod support;

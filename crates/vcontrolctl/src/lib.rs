//! Subcommands of the `vcontrolctl` binary.

pub mod cmd_allow;
pub mod cmd_check;
pub mod cmd_show;
pub mod cmd_tree;
pub mod cmd_watch;
pub mod common;

#[cfg(test)]
mod test_support;

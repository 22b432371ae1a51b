// ABOUTME: Command module aggregator for the rollover CLI.
// ABOUTME: Re-exports the upgrade command handler.

mod upgrade;

pub use upgrade::upgrade;

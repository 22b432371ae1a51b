// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: One invocation upgrades one container using one named template.

use clap::Parser;
use rollover::template::DEFAULT_TEMPLATES_DIR;
use rollover::types::ContainerName;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollover")]
#[command(about = "Upgrade a container to its latest image, rolling back if it fails its health check")]
#[command(version)]
pub struct Cli {
    /// Template describing how to run and health-check the application
    pub template: String,

    /// Name of the running container to upgrade
    pub container: ContainerName,

    /// Health attempts before rolling back (overrides the template)
    #[arg(short, long)]
    pub timeout: Option<u32>,

    /// Directory holding the templates
    #[arg(long, default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,

    /// Display name of the notification sender
    #[arg(long)]
    pub email_sender_name: Option<String>,

    /// Address notifications are sent from
    #[arg(long)]
    pub email_sender_address: Option<String>,

    /// Comma-separated notification recipients; without it results are only logged
    #[arg(long)]
    pub email_recipients: Option<String>,

    /// Break an existing upgrade lock for this container
    #[arg(long)]
    pub force_unlock: bool,

    /// Emit JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Gaze LWS - Detect gaze events and classify looking-without-seeing instances
#[derive(Parser, Debug)]
#[command(name = "gaze-lws")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one trial file
    Process {
        /// Input trial file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output report file (defaults to the reports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Process every trial file in a directory
    Batch {
        /// Directory of trial files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory for reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the active config file location (`--config`, else the default)
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "detection.saccade_detector", "lws.proximity_threshold_deg")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a specific configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the reports output directory
    pub fn reports_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".gaze_lws").join("reports"))
            .unwrap_or_else(|| PathBuf::from("reports"))
    }

    /// Report file for a trial file, inside `output_dir`
    pub fn report_path(output_dir: &Path, trial_file: &Path) -> PathBuf {
        let stem = trial_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "trial".to_string());
        output_dir.join(format!("{}_report.json", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_reports_dir() {
        let dir = Cli::reports_dir();
        assert!(dir.to_string_lossy().contains("reports"));
    }

    #[test]
    fn test_report_path() {
        let path = Cli::report_path(Path::new("/out"), Path::new("/data/S012_T004.json"));
        assert_eq!(path, PathBuf::from("/out/S012_T004_report.json"));
    }

    #[test]
    fn test_cli_parse_process_command() {
        let args = vec![
            "gaze-lws",
            "process",
            "--input", "/path/to/trial.json",
            "--output", "/path/to/report.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Process { input, output } => {
                assert_eq!(input, PathBuf::from("/path/to/trial.json"));
                assert_eq!(output, Some(PathBuf::from("/path/to/report.json")));
            }
            _ => panic!("Expected Process command"),
        }
    }

    #[test]
    fn test_cli_parse_process_requires_input() {
        let args = vec!["gaze-lws", "process"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parse_batch_command_defaults() {
        let args = vec!["gaze-lws", "batch", "-i", "/data/trials"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Batch { input_dir, output_dir } => {
                assert_eq!(input_dir, PathBuf::from("/data/trials"));
                assert!(output_dir.is_none());
            }
            _ => panic!("Expected Batch command"),
        }
    }

    #[test]
    fn test_cli_parse_init_command() {
        let args = vec!["gaze-lws", "init", "--force"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let args = vec![
            "gaze-lws",
            "-v",
            "--config", "/path/to/config.toml",
            "init",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let args = vec!["gaze-lws", "batch", "-i", "/data", "--verbose"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_config_set() {
        let args = vec!["gaze-lws", "config", "set", "lws.proximity_threshold_deg", "2.0"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Config { action: ConfigAction::Set { key, value } } => {
                assert_eq!(key, "lws.proximity_threshold_deg");
                assert_eq!(value, "2.0");
            }
            _ => panic!("Expected Config Set command"),
        }
    }

    #[test]
    fn test_cli_parse_config_subcommands() {
        for (arg, expected) in [("show", "Show"), ("path", "Path")] {
            let cli = Cli::try_parse_from(vec!["gaze-lws", "config", arg]).unwrap();
            let Commands::Config { action } = cli.command else {
                panic!("Expected Config command");
            };
            assert_eq!(format!("{:?}", action), expected);
        }

        let cli = Cli::try_parse_from(vec!["gaze-lws", "config", "reset", "-f"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Reset { force: true } }
        ));
    }

    #[test]
    fn test_cli_unknown_subcommand() {
        assert!(Cli::try_parse_from(vec!["gaze-lws", "record"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}

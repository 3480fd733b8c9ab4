use crate::config::{ConfigError, FakeDataConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fakedatafs", version)]
#[command(about = "Mount a read-only filesystem filled with deterministic fake data", long_about = None)]
pub struct Cli {
    /// Directory to mount the filesystem on
    pub mountpoint: PathBuf,

    /// Root seed for names, sizes and content
    #[arg(long, env = "FAKEDATAFS_SEED")]
    pub seed: Option<u64>,

    /// Number of files in the root directory
    #[arg(short = 'n', long = "files-per-dir")]
    pub files_per_dir: Option<usize>,

    /// Maximum file size in KiB
    #[arg(short = 'm', long = "maxsize")]
    pub max_size_kib: Option<u64>,

    /// TOML or JSON config file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated mount options (allow_other, allow_root, auto_unmount, default_permissions)
    #[arg(short = 'o', long = "options", default_value = "")]
    pub options: String,

    /// Log mount lifecycle and per-request summaries
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every FUSE request
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Loads the config file if one was given, then applies flag overrides.
    pub fn build_config(&self) -> Result<FakeDataConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FakeDataConfig::from_file(path)?,
            None => FakeDataConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(n) = self.files_per_dir {
            config.files_per_dir = n;
        }
        if let Some(m) = self.max_size_kib {
            config.max_size_kib = m;
        }
        config.validate()?;
        Ok(config)
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["fakedatafs", "/mnt/fake"]).unwrap();
        assert_eq!(cli.mountpoint, PathBuf::from("/mnt/fake"));
        assert!(cli.files_per_dir.is_none());
        assert!(cli.options.is_empty());
        assert_eq!(cli.log_filter(), "warn");

        let config = cli.build_config().unwrap();
        assert_eq!(config.files_per_dir, 100);
        assert_eq!(config.max_size_kib, 100);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "fakedatafs", "--seed", "99", "-n", "5", "-m", "2048", "-o", "allow_other", "-v",
            "/mnt/fake",
        ])
        .unwrap();
        assert_eq!(cli.log_filter(), "info");
        assert_eq!(cli.options, "allow_other");

        let config = cli.build_config().unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.files_per_dir, 5);
        assert_eq!(config.max_size_kib, 2048);
    }

    #[test]
    fn test_debug_wins_over_verbose() {
        let cli = Cli::try_parse_from(["fakedatafs", "-v", "--debug", "/mnt"]).unwrap();
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn test_missing_mountpoint_is_error() {
        assert!(Cli::try_parse_from(["fakedatafs"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "seed = 1\nfiles_per_dir = 3\nmax_size_kib = 10").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli =
            Cli::try_parse_from(["fakedatafs", "--config", &path, "-n", "7", "/mnt"]).unwrap();
        let config = cli.build_config().unwrap();
        assert_eq!(config.seed, cli.seed.unwrap_or(1));
        assert_eq!(config.files_per_dir, 7);
        assert_eq!(config.max_size_kib, 10);
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let cli = Cli::try_parse_from(["fakedatafs", "-m", "0", "/mnt"]).unwrap();
        assert!(matches!(cli.build_config(), Err(ConfigError::Invalid(_))));
    }
}

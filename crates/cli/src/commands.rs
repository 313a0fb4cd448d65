use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one incremental pass and exit
    Run {
        #[arg(long, help = "Print the run report as JSON")]
        json: bool,
    },
    /// Run at the configured interval until SIGINT or SIGTERM
    Watch,
    /// Show the watermark, the latest run and any skipped dates
    Status {
        #[arg(long, help = "Print the status as JSON instead of a table")]
        json: bool,
    },
    /// List the most recently stored records
    History {
        #[arg(long, default_value_t = 20, help = "Number of dates to show")]
        limit: usize,

        #[arg(long, help = "Print the records as JSON instead of a table")]
        json: bool,
    },
    /// Classify a value with a sensor's built-in profile
    Classify {
        /// Sensor profile: "smap" or "sentinel1"
        #[arg(long)]
        sensor: String,

        /// Zonal mean to classify; omit for an empty reduction
        #[arg(allow_hyphen_values = true)]
        value: Option<f64>,
    },
}

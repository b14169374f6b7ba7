use std::path::PathBuf;

use clap::Args;
use galshell_logic::RunConfig;

/// Parse a comma-separated list, e.g. `1e-6,1`.
fn parse_list<T: std::str::FromStr>(s: &str) -> Result<Vec<T>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<T>()
                .map_err(|_| format!("invalid list entry '{}'", part.trim()))
        })
        .collect()
}

/// Parse `low,high` bounds.
pub fn parse_range(s: &str) -> Result<(f64, f64), String> {
    match parse_list::<f64>(s)?.as_slice() {
        [low, high] => Ok((*low, *high)),
        _ => Err("range must be in format 'low,high'".to_string()),
    }
}

/// Shell-model flags. Each one, when given, overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ShellOverrides {
    /// Shell inner radius in light-years
    #[arg(long)]
    pub inner_ly: Option<f64>,

    /// Shell outer radius in light-years
    #[arg(long)]
    pub outer_ly: Option<f64>,

    /// Observer galactocentric radius in parsecs
    #[arg(long)]
    pub observer_radius: Option<f64>,

    /// Disk radial scale length in parsecs
    #[arg(long)]
    pub scale_length: Option<f64>,

    /// Disk vertical scale height in parsecs
    #[arg(long)]
    pub scale_height: Option<f64>,

    /// Normalization cutoff radius in parsecs
    #[arg(long)]
    pub cutoff_radius: Option<f64>,

    /// Total stars within the cutoff radius
    #[arg(long)]
    pub total_population: Option<f64>,

    /// Parametric arm count (used when no table loads)
    #[arg(long)]
    pub arms: Option<usize>,

    /// Parametric arm pitch in degrees
    #[arg(long)]
    pub pitch_deg: Option<f64>,

    /// Arm half-width in parsecs
    #[arg(long)]
    pub half_width: Option<f64>,

    /// Azimuth search window half-width in degrees
    #[arg(long)]
    pub window_deg: Option<f64>,

    /// Azimuth search grid steps (odd)
    #[arg(long)]
    pub window_steps: Option<usize>,

    /// Arm table CSV (name,R_ref_pc,phi_ref_deg,pitch_deg)
    #[arg(long)]
    pub arm_table: Option<PathBuf>,

    /// Monte Carlo sample count
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Points per parallel chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Alternate totals for the sensitivity sweep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub sensitivity: Option<Vec<f64>>,
}

impl ShellOverrides {
    pub fn apply(&self, config: &mut RunConfig) {
        let shell = &mut config.shell;
        set(&mut shell.inner_radius_ly, self.inner_ly);
        set(&mut shell.outer_radius_ly, self.outer_ly);
        set(&mut shell.observer_radius_pc, self.observer_radius);

        let disk = &mut config.disk;
        set(&mut disk.scale_length_pc, self.scale_length);
        set(&mut disk.scale_height_pc, self.scale_height);
        set(&mut disk.cutoff_radius_pc, self.cutoff_radius);
        set(&mut disk.total_population, self.total_population);

        let arms = &mut config.arms;
        set(&mut arms.count, self.arms);
        set(&mut arms.pitch_deg, self.pitch_deg);
        set(&mut arms.half_width_pc, self.half_width);
        set(&mut arms.window_half_width_deg, self.window_deg);
        set(&mut arms.window_steps, self.window_steps);
        if let Some(table) = &self.arm_table {
            arms.table = Some(table.clone());
        }

        let sampling = &mut config.sampling;
        set(&mut sampling.samples, self.samples);
        set(&mut sampling.seed, self.seed);
        set(&mut sampling.chunk_size, self.chunk_size);
        if let Some(totals) = &self.sensitivity {
            sampling.sensitivity_totals = totals.clone();
        }
    }
}

/// Drake-stage flags.
#[derive(Args, Debug, Clone, Default)]
pub struct DrakeOverrides {
    /// Star count to use instead of the shell results
    #[arg(long)]
    pub n_stars: Option<f64>,

    /// Monte Carlo sample count
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// f_l log-uniform bounds (low,high)
    #[arg(long, value_parser = parse_range)]
    pub f_l: Option<(f64, f64)>,

    /// f_i log-uniform bounds (low,high)
    #[arg(long, value_parser = parse_range)]
    pub f_i: Option<(f64, f64)>,

    /// f_c uniform bounds (low,high)
    #[arg(long, value_parser = parse_range)]
    pub f_c: Option<(f64, f64)>,

    /// Civilization lifetime log-uniform bounds in years (low,high)
    #[arg(long, value_parser = parse_range)]
    pub lifetime: Option<(f64, f64)>,
}

impl DrakeOverrides {
    pub fn apply(&self, config: &mut RunConfig) {
        let drake = &mut config.drake;
        if self.n_stars.is_some() {
            drake.n_stars = self.n_stars;
        }
        set(&mut drake.samples, self.samples);
        set(&mut drake.seed, self.seed);
        set(&mut drake.f_l_range, self.f_l);
        set(&mut drake.f_i_range, self.f_i);
        set(&mut drake.f_c_range, self.f_c);
        set(&mut drake.l_range_years, self.lifetime);
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}

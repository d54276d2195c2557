use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use half::{bf16, f16};
use tracing::Level;

use lineattn_core::{
    pack_lines, unpack_lines, AttentionConfig, DType, Dims, Element, InputLayout, Line, PORT_BITS,
};
use lineattn_kernel::{compare, random_elements, reference_attention, CausalAttention, SimdCapability};

const BANNER: &str = r#"
 _ _                  _   _
| (_)_ __   ___  __ _| |_| |_ _ __
| | | '_ \ / _ \/ _` | __| __| '_ \
| | | | | |  __/ (_| | |_| |_| | | |
|_|_|_| |_|\___|\__,_|\__|\__|_| |_|"#;

#[derive(Parser)]
#[command(
    name = "lineattn",
    about = "Causal attention over a line-granular memory port",
    long_about = "Runs the streaming causal self-attention kernel on random inputs,\nchecks it against a plain reference, and times it.",
    version,
)]
struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ShapeArgs {
    /// JSON config file (flags below override its fields)
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,
    /// Shape preset: default, wide, batched
    #[arg(long)]
    preset: Option<String>,
    /// Element type: f16, bf16, f32, f64
    #[arg(long)]
    dtype: Option<DType>,
    /// Input layout: concatenated, interleaved
    #[arg(long)]
    layout: Option<InputLayout>,
    #[arg(long)]
    batch: Option<usize>,
    #[arg(long)]
    tokens: Option<usize>,
    #[arg(long)]
    channels: Option<usize>,
    /// Seed for the random inputs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show platform, SIMD tier and line widths
    Info,
    /// Run the kernel on random inputs and compare with the reference
    Verify {
        #[command(flatten)]
        shape: ShapeArgs,
        /// Absolute tolerance per element
        #[arg(long)]
        epsilon: Option<f64>,
        /// Spread batches over the thread pool
        #[arg(long)]
        parallel: bool,
        /// Print the effective config as JSON and exit
        #[arg(long)]
        dump_config: bool,
    },
    /// Time sequential, parallel and reference runs
    Bench {
        #[command(flatten)]
        shape: ShapeArgs,
        #[arg(long, default_value = "10")]
        iters: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Info => cmd_info(),
        Commands::Verify { shape, epsilon, parallel, dump_config } => {
            shape.resolve().and_then(|mut cfg| {
                if let Some(eps) = epsilon {
                    cfg.epsilon = eps;
                }
                cfg.parallel |= parallel;
                if dump_config {
                    println!("{}", serde_json::to_string_pretty(&cfg)?);
                    return Ok(true);
                }
                cmd_verify(&cfg)
            })
        }
        Commands::Bench { shape, iters } => shape.resolve().and_then(|cfg| cmd_bench(&cfg, iters.max(1))),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

impl ShapeArgs {
    fn resolve(&self) -> anyhow::Result<AttentionConfig> {
        let mut cfg = match (&self.config, &self.preset) {
            (Some(path), _) => AttentionConfig::from_json_file(path)?,
            (None, Some(name)) => AttentionConfig::preset(name).with_context(|| {
                format!("unknown preset '{}' (expected {})", name, AttentionConfig::PRESETS.join(", "))
            })?,
            (None, None) => AttentionConfig::default(),
        };
        if let Some(v) = self.dtype {
            cfg.dtype = v;
        }
        if let Some(v) = self.layout {
            cfg.layout = v;
        }
        if let Some(v) = self.batch {
            cfg.batch = v;
        }
        if let Some(v) = self.tokens {
            cfg.tokens = v;
        }
        if let Some(v) = self.channels {
            cfg.channels = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        Ok(cfg)
    }
}

fn cmd_info() -> anyhow::Result<bool> {
    println!("{}", BANNER);
    println!("  v{}  -  streaming causal attention\n", env!("CARGO_PKG_VERSION"));

    println!("Platform");
    println!("  OS:      {}", std::env::consts::OS);
    println!("  Arch:    {}", std::env::consts::ARCH);
    println!("  Threads: {}", rayon::current_num_threads());

    let simd = SimdCapability::detect();
    println!("\nSIMD");
    println!("  Tier:    {} ({} bits)", simd.tier, simd.tier.register_bits());
    println!("  FMA:     {}", if simd.fma { "[x]" } else { "[ ]" });
    match simd.registers_per_line() {
        Some(n) => println!("  One {}-bit line = {} vector register(s)", PORT_BITS, n),
        None => println!("  Lines are processed lane by lane"),
    }

    println!("\nLines ({}-bit port)", PORT_BITS);
    for dt in DType::ALL {
        println!("  {:<5} {:>2} lanes x {:>2} bits", dt.to_string(), dt.lanes(), dt.bits());
    }

    println!("\nPresets");
    for name in AttentionConfig::PRESETS {
        if let Some(cfg) = AttentionConfig::preset(name) {
            println!("  {:<8} B={} T={} C={}", name, cfg.batch, cfg.tokens, cfg.channels);
        }
    }
    Ok(true)
}

fn cmd_verify(cfg: &AttentionConfig) -> anyhow::Result<bool> {
    let dims = cfg.dims()?;
    match cfg.dtype {
        DType::F16 => verify_typed::<f16, 32>(cfg, dims),
        DType::BF16 => verify_typed::<bf16, 32>(cfg, dims),
        DType::F32 => verify_typed::<f32, 16>(cfg, dims),
        DType::F64 => verify_typed::<f64, 8>(cfg, dims),
    }
}

fn verify_typed<E: Element, const L: usize>(cfg: &AttentionConfig, dims: Dims) -> anyhow::Result<bool> {
    println!("=== lineattn verify ===");
    print_shape(cfg, &dims);

    let flat: Vec<E> = random_elements(3 * dims.tensor_elements(), cfg.seed);
    let input = pack_lines::<E, L>(&flat)?;
    let mut out = vec![Line::<E, L>::zeroed(); dims.output_lines()];
    let mut attn = CausalAttention::<E, L>::new(dims, cfg.layout)?;

    let start = Instant::now();
    if cfg.parallel {
        attn.run_parallel(&input, &mut out)?;
    } else {
        attn.run(&input, &mut out)?;
    }
    let kernel_s = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let reference = reference_attention(&dims, cfg.layout, &flat)?;
    let ref_s = start.elapsed().as_secs_f64();

    let report = compare(&unpack_lines(&out), &reference, cfg.epsilon)?;
    println!(
        "Kernel:    {:.3}ms ({})",
        kernel_s * 1000.0,
        if cfg.parallel { "batch-parallel" } else { "sequential" }
    );
    println!("Reference: {:.3}ms\n", ref_s * 1000.0);
    println!("{}", report);

    tracing::info!(
        errors = report.error_count(),
        max_diff = report.max_diff,
        "verification finished"
    );
    Ok(report.passed())
}

fn cmd_bench(cfg: &AttentionConfig, iters: usize) -> anyhow::Result<bool> {
    let dims = cfg.dims()?;
    match cfg.dtype {
        DType::F16 => bench_typed::<f16, 32>(cfg, dims, iters),
        DType::BF16 => bench_typed::<bf16, 32>(cfg, dims, iters),
        DType::F32 => bench_typed::<f32, 16>(cfg, dims, iters),
        DType::F64 => bench_typed::<f64, 8>(cfg, dims, iters),
    }
}

fn bench_typed<E: Element, const L: usize>(
    cfg: &AttentionConfig,
    dims: Dims,
    iters: usize,
) -> anyhow::Result<bool> {
    println!("=== lineattn bench ({} iters) ===", iters);
    print_shape(cfg, &dims);

    let flat: Vec<E> = random_elements(3 * dims.tensor_elements(), cfg.seed);
    let input = pack_lines::<E, L>(&flat)?;
    let mut out = vec![Line::<E, L>::zeroed(); dims.output_lines()];
    let mut attn = CausalAttention::<E, L>::new(dims, cfg.layout)?;

    // Warmup
    attn.run(&input, &mut out)?;

    let seq_s = time_it(iters, || attn.run(&input, &mut out))?;
    let par_s = time_it(iters, || attn.run_parallel(&input, &mut out))?;
    let ref_s = time_it(iters, || reference_attention(&dims, cfg.layout, &flat).map(|_| ()))?;

    let traffic = attn.plan().line_traffic();
    println!("\n{:<14} {:>12} {:>10}", "Run", "Time (ms)", "vs ref");
    println!("{}", "-".repeat(38));
    for (name, secs) in [("sequential", seq_s), ("parallel", par_s), ("reference", ref_s)] {
        println!("{:<14} {:>10.3}ms {:>9.1}x", name, secs * 1000.0, ref_s / secs);
    }

    println!("\nLines moved per run");
    println!("  input reads:   {}", traffic.input_reads);
    println!("  score reads:   {}", traffic.score_reads);
    println!("  score writes:  {}", traffic.score_writes);
    println!("  output writes: {}", traffic.output_writes);
    println!("  throughput:    {:.1} Mlines/s", traffic.total() as f64 / seq_s / 1e6);
    Ok(true)
}

fn print_shape(cfg: &AttentionConfig, dims: &Dims) {
    println!(
        "Shape:  B={} T={} C={} ({} lanes/line, {} row lines)",
        dims.batch(),
        dims.tokens(),
        dims.channels(),
        dims.lanes(),
        dims.row_lines()
    );
    println!("DType:  {}   Layout: {}   Seed: {}\n", cfg.dtype, cfg.layout, cfg.seed);
}

/// Mean seconds per call; stops at the first error.
fn time_it<E>(iters: usize, mut f: impl FnMut() -> Result<(), E>) -> Result<f64, E> {
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_secs_f64() / iters as f64)
}

//! Supertrend CLI: backtest, latest-signal, and bar validation commands.
//!
//! Commands:
//! - `run`: full backtest from a TOML config, prints a summary and saves artifacts
//! - `signal`: indicator-only pass, reports and paper-trades the latest signal
//! - `validate`: boundary checks on a bar file

mod obs;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use supertrend_core::{latest_actionable, validate_bars, Bar, FormingBarPolicy, Signal};
use supertrend_runner::backtest::position_series;
use supertrend_runner::{
    act_on_latest_signal, annotate, mark_forming_bar, run_backtest, save_artifacts, BacktestConfig,
    BacktestResult, BarSource, CsvBarSource, PaperExecutor, SharpeRatio,
};
use tracing::info;

use crate::obs::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(name = "supertrend", about = "Supertrend indicator, signals, and backtests")]
struct Cli {
    /// Log filter (e.g. info, debug, supertrend_runner=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        #[arg(long)]
        config: PathBuf,

        /// Bar CSV. Overrides `[data].path` in the config.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Report the signal on the latest closed bar and pass it to a paper executor.
    Signal {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        bars: Option<PathBuf>,

        /// Order size in base units.
        #[arg(long, default_value_t = 0.05)]
        size: f64,
    },
    /// Check a bar file for ordering and value errors.
    Validate {
        #[arg(long)]
        bars: PathBuf,

        #[arg(long, default_value_t = false)]
        allow_forming_bar: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            bars,
            output_dir,
        } => run_cmd(&config, bars.as_deref(), &output_dir),
        Commands::Signal { config, bars, size } => signal_cmd(&config, bars.as_deref(), size),
        Commands::Validate {
            bars,
            allow_forming_bar,
        } => validate_cmd(&bars, allow_forming_bar),
    }
}

/// Resolve the bar file and symbol from the CLI override or the config.
fn load_bars(config: &BacktestConfig, override_path: Option<&Path>) -> Result<(String, Vec<Bar>)> {
    let (path, symbol) = match (override_path, &config.data) {
        (Some(path), data) => (
            path.to_path_buf(),
            data.as_ref().map_or_else(|| "UNKNOWN".to_string(), |d| d.symbol.clone()),
        ),
        (None, Some(data)) => (data.path.clone(), data.symbol.clone()),
        (None, None) => bail!("no bar file: pass --bars or set [data].path in the config"),
    };
    let bars = CsvBarSource::new(&path)
        .load(&symbol)
        .with_context(|| format!("loading bars from {}", path.display()))?;
    Ok((symbol, bars))
}

fn run_cmd(config_path: &Path, bars_path: Option<&Path>, output_dir: &Path) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let (symbol, bars) = load_bars(&config, bars_path)?;

    let result = run_backtest(&bars, &config)?;
    print_summary(&symbol, &result);

    let paths = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn signal_cmd(config_path: &Path, bars_path: Option<&Path>, size: f64) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let (symbol, mut bars) = load_bars(&config, bars_path)?;

    if mark_forming_bar(&mut bars, chrono::Utc::now()) && !config.backtest.allow_forming_bar {
        info!("dropping the still-forming last bar");
        bars.pop();
    }

    let annotated = annotate(&bars, &config.strategy, config.forming_bar_policy())?;
    let Some((index, signal)) = latest_actionable(&bars, &annotated.signals) else {
        println!("No closed bar to act on");
        return Ok(());
    };

    let row = &annotated.rows[index];
    println!("Symbol:      {symbol}");
    println!("Bar:         {}", row.timestamp.to_rfc3339());
    println!("Close:       {:.4}", row.close);
    match row.trend_up {
        Some(true) => println!("Trend:       up"),
        Some(false) => println!("Trend:       down"),
        None => println!("Trend:       (warm-up)"),
    }
    if let Some(band) = row.supertrend {
        println!("Supertrend:  {band:.4}");
    }
    println!("Signal:      {}", signal_label(signal));

    // Paper book starts from the position held going into the signal bar.
    let held = position_series(&annotated.signals[..index]).last() == Some(&1);
    let mut executor = PaperExecutor::with_position(held);
    let ack = act_on_latest_signal(&bars, &annotated.signals, &mut executor, &symbol, size)?;
    if let Some(ack) = ack {
        println!("{}", serde_json::to_string_pretty(&ack)?);
    }
    Ok(())
}

fn validate_cmd(bars_path: &Path, allow_forming_bar: bool) -> Result<()> {
    let bars = CsvBarSource::new(bars_path).load(&bars_path.display().to_string())?;
    let policy = if allow_forming_bar {
        FormingBarPolicy::Include
    } else {
        FormingBarPolicy::Reject
    };
    let summary = validate_bars(&bars, policy)?;
    println!(
        "OK: {} bars, {} to {}{}",
        summary.len,
        bars[0].timestamp.to_rfc3339(),
        bars[summary.len - 1].timestamp.to_rfc3339(),
        if summary.includes_forming_bar {
            " (last bar still forming)"
        } else {
            ""
        }
    );
    Ok(())
}

fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "BUY",
        Signal::Sell => "SELL",
        Signal::None => "none",
    }
}

fn print_summary(symbol: &str, result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {symbol}");
    if let (Some(first), Some(last)) = (result.rows.first(), result.rows.last()) {
        println!(
            "Period:         {} to {}",
            first.timestamp.to_rfc3339(),
            last.timestamp.to_rfc3339()
        );
    }
    println!("Bars:           {}", result.bar_count);
    println!("Signals:        {}", result.signal_count);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", result.metrics.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", result.metrics.max_drawdown * 100.0);
    match result.metrics.sharpe {
        SharpeRatio::Defined(v) => println!("Sharpe:         {v:.3}"),
        SharpeRatio::Undefined(reason) => println!("Sharpe:         undefined ({reason:?})"),
    }
    if let Some(equity) = result.equity_curve.last() {
        println!("Final Equity:   {equity:.2}");
    }
    println!("Run ID:         {}", result.run_id);
    if result.includes_forming_bar {
        println!();
        println!("WARNING: last bar was still forming");
    }
}

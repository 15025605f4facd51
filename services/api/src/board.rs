use crate::cli::{BoardArgs, ClassifyArgs, CloseArgs, PeriodsArgs};
use crate::infra::build_resolver;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use tier_board::config::AppConfig;
use tier_board::error::AppError;
use tier_board::feed::parse_csv;
use tier_board::periods::{ClosedPeriod, FrozenBoard, PeriodBoard, ViewQuery};
use tier_board::snapshots::SnapshotSummary;
use tier_board::telemetry::{self, LogSink};
use tier_board::tiers::{ClassificationEngine, ClassificationResult, TierBoard, TierKey};
use tracing::info;

fn cli_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}

fn print_lines(lines: Vec<String>) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    cli_config()?;
    let reader = BufReader::new(File::open(&args.csv)?);
    let rows = parse_csv(reader)?;
    let board = ClassificationEngine::default().classify_all(&rows);
    info!(path = %args.csv.display(), representatives = rows.len(), "csv export classified");

    if let Some(name) = args.representative.as_deref() {
        let detail = board.find(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("representative '{name}' is not in {}", args.csv.display()),
            )
        })?;
        return if args.json {
            print_json(detail)
        } else {
            print_lines(render_detail(detail))
        };
    }

    if args.json {
        print_json(&board)
    } else {
        print_lines(render_board(&board))
    }
}

pub(crate) async fn run_board(args: BoardArgs) -> Result<(), AppError> {
    let config = cli_config()?;
    let query = ViewQuery {
        frozen: args.frozen.then(|| "1".to_string()),
        year: args.year,
        month: args.month,
    };
    let mode = query.view_mode()?;
    let resolver = build_resolver(&config).await?;
    let board = resolver.resolve(&args.branch, mode).await?;

    if args.json {
        return print_json(&board);
    }
    match board {
        PeriodBoard::Live(live) => {
            let mut lines = vec![format!("{} ({}) live board", live.branch, live.branch_key)];
            lines.extend(render_board(&live.board));
            print_lines(lines)
        }
        PeriodBoard::Frozen(frozen) => print_lines(render_frozen(&frozen)?),
    }
}

pub(crate) async fn run_close(args: CloseArgs) -> Result<(), AppError> {
    let config = cli_config()?;
    let resolver = build_resolver(&config).await?;
    let closed = resolver
        .close_period(&args.branch, args.year, args.month, None)
        .await?;
    print_lines(vec![render_closed(&closed)])
}

pub(crate) async fn run_periods(args: PeriodsArgs) -> Result<(), AppError> {
    let config = cli_config()?;
    let resolver = build_resolver(&config).await?;
    let periods = resolver.list_periods(&args.branch).await?;
    print_lines(render_periods(&args.branch, &periods))
}

pub(crate) fn render_board(board: &TierBoard) -> Vec<String> {
    let mut lines = Vec::with_capacity(board.representatives.len() + 2);
    let distribution: Vec<String> = TierKey::ordered()
        .iter()
        .rev()
        .map(|tier| {
            let count = board.distribution.get(tier).copied().unwrap_or(0);
            format!("{} {}", tier.label(), count)
        })
        .collect();
    lines.push(format!(
        "{} representatives | {}",
        board.representatives.len(),
        distribution.join(" | ")
    ));

    for result in &board.representatives {
        let mut line = format!(
            "- {} ({}): {}",
            result.representative,
            result.supervisor,
            result.achieved_tier.label()
        );
        match &result.next_tier {
            Some(gap) => {
                line.push_str(&format!(
                    " | {} pts toward {}",
                    result.progress_points(),
                    gap.tier.label()
                ));
                if !gap.missing_criteria.is_empty() {
                    let missing: Vec<&str> =
                        gap.missing_criteria.iter().map(|c| c.label()).collect();
                    line.push_str(&format!(" | missing {}", missing.join(", ")));
                }
            }
            None => line.push_str(&format!(" | {} pts", result.progress_points())),
        }
        lines.push(line);
    }
    lines
}

pub(crate) fn render_detail(result: &ClassificationResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}) achieved {}",
        result.representative,
        result.supervisor,
        result.achieved_tier.label()
    )];
    for (tier, scores) in &result.comparisons {
        lines.push(format!(
            "{}: {}/{} pts",
            tier.label(),
            scores.total_points,
            scores.achievable_points
        ));
        for outcome in &scores.criteria {
            lines.push(format!(
                "  [{}] {} required {} actual {}",
                if outcome.met { "x" } else { " " },
                outcome.criterion.label(),
                outcome.required,
                outcome.actual
            ));
        }
    }
    lines
}

fn render_frozen(frozen: &FrozenBoard) -> Result<Vec<String>, AppError> {
    let mut lines = vec![format!(
        "{} ({}) frozen {:04}-{:02}, snapshot {} closed {}",
        frozen.branch,
        frozen.branch_key,
        frozen.snapshot.period_year,
        frozen.snapshot.period_month,
        frozen.snapshot.id,
        frozen.snapshot.closed_at.format("%Y-%m-%d %H:%M UTC")
    )];
    let payload = serde_json::to_string_pretty(&frozen.payload).map_err(io::Error::from)?;
    lines.extend(payload.lines().map(str::to_string));
    Ok(lines)
}

fn render_closed(closed: &ClosedPeriod) -> String {
    format!(
        "closed {:04}-{:02} for {} ({} representatives) as snapshot {}",
        closed.period_year, closed.period_month, closed.branch, closed.representatives, closed.id
    )
}

pub(crate) fn render_periods(branch_key: &str, periods: &[SnapshotSummary]) -> Vec<String> {
    if periods.is_empty() {
        return vec![format!("no closed periods for {branch_key}")];
    }
    periods
        .iter()
        .map(|summary| {
            format!(
                "{:04}-{:02}  snapshot {}  closed {}",
                summary.period_year,
                summary.period_month,
                summary.id,
                summary.closed_at.format("%Y-%m-%d %H:%M UTC")
            )
        })
        .collect()
}

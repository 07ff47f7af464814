use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use stackrace_game::{CompetitorResult, SimulationReport};

fn seed_label(report: &SimulationReport) -> String {
    report
        .seed
        .map_or_else(|| "shared stream".to_string(), |seed| seed.to_string())
}

fn percent(rate: f64) -> f64 {
    rate * 100.0
}

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &SimulationReport,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Race Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;
    writeln!(out, "Races: {}", report.runs)?;
    writeln!(out, "Board length: {}", report.board_length)?;
    writeln!(out, "Seed: {}", seed_label(report))?;
    writeln!(out, "Simulation time: {total_duration:?}")?;
    writeln!(out)?;

    writeln!(
        out,
        "{:>4}  {:<16} {:>8} {:>9} {:>8} {:>7} {:>8}",
        "#", "Competitor", "Wins", "Win rate", "± SE", "Weight", "EV"
    )?;
    for (rank, result) in report.ranked().into_iter().enumerate() {
        let line = format!(
            "{:>4}  {:<16} {:>8} {:>8.2}% {:>7.2}% {:>7.2} {:>8.4}",
            rank + 1,
            result.name,
            result.wins,
            percent(result.win_rate),
            percent(result.std_error),
            result.weight,
            result.expected_value
        );
        if rank == 0 {
            writeln!(out, "{}", line.green().bold())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }

    let never_won: Vec<&str> = report
        .results
        .iter()
        .filter(|result| result.wins == 0)
        .map(|result| result.name.as_str())
        .collect();
    if !never_won.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} {}", "Never won:".yellow(), never_won.join(", "))?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    writeln!(out, "# Stackrace Simulation Results\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Races**: {}", report.runs)?;
    writeln!(out, "- **Board length**: {}", report.board_length)?;
    writeln!(out, "- **Seed**: {}\n", seed_label(report))?;

    writeln!(out, "## Ranking by expected value\n")?;
    writeln!(
        out,
        "| Rank | Competitor | Wins | Win rate | Std. error | Weight | Expected value |"
    )?;
    writeln!(out, "|---:|---|---:|---:|---:|---:|---:|")?;
    for (rank, result) in report.ranked().into_iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {:.2}% | {:.2}% | {:.2} | {:.4} |",
            rank + 1,
            result.name,
            result.wins,
            percent(result.win_rate),
            percent(result.std_error),
            result.weight,
            result.expected_value
        )?;
    }
    Ok(())
}

/// One row per competitor in roster order.
pub fn generate_csv_report(out: &mut dyn Write, report: &SimulationReport) -> Result<()> {
    writeln!(out, "key,name,weight,wins,win_rate,expected_value,std_error")?;
    for result in &report.results {
        writeln!(out, "{}", csv_row(result))?;
    }
    Ok(())
}

fn csv_row(result: &CompetitorResult) -> String {
    format!(
        "{},{},{},{},{:.6},{:.6},{:.6}",
        csv_field(&result.key),
        csv_field(&result.name),
        result.weight,
        result.wins,
        result.win_rate,
        result.expected_value,
        result.std_error
    )
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackrace_game::CompetitorId;

    fn result(index: usize, key: &str, name: &str, wins: u64, weight: f64) -> CompetitorResult {
        let win_rate = wins as f64 / 100.0;
        CompetitorResult {
            id: CompetitorId::from_index(index),
            key: key.to_string(),
            name: name.to_string(),
            weight,
            wins,
            win_rate,
            expected_value: win_rate * weight,
            std_error: (win_rate * (1.0 - win_rate) / 100.0).sqrt(),
        }
    }

    fn sample_report() -> SimulationReport {
        SimulationReport {
            runs: 100,
            seed: Some(7),
            board_length: 24,
            results: vec![
                result(0, "a", "Alpha", 60, 1.0),
                result(1, "b", "Beta, the Second", 40, 2.0),
                result(2, "c", "Gamma", 0, 1.5),
            ],
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn console_report_ranks_by_expected_value() {
        let text = render(|out| {
            generate_console_report(out, &sample_report(), Duration::from_millis(5))
        });
        assert!(text.contains("Races: 100"));
        assert!(text.contains("Seed: 7"));
        let beta = text.find("Beta").unwrap();
        let alpha = text.find("Alpha").unwrap();
        assert!(beta < alpha, "Beta has the higher expected value");
        assert!(text.contains("Never won:"));
    }

    #[test]
    fn json_report_is_the_serialized_summary() {
        let text = render(|out| generate_json_report(out, &sample_report()));
        let parsed: SimulationReport = serde_json::from_str(&text).unwrap();
        let expected = sample_report();
        assert_eq!(parsed.runs, expected.runs);
        assert_eq!(parsed.seed, expected.seed);
        for (got, want) in parsed.results.iter().zip(&expected.results) {
            assert_eq!((got.id, &got.key, got.wins), (want.id, &want.key, want.wins));
            assert!((got.win_rate - want.win_rate).abs() < 1e-12);
        }
    }

    #[test]
    fn markdown_report_has_a_row_per_competitor() {
        let text = render(|out| generate_markdown_report(out, &sample_report()));
        assert!(text.starts_with("# Stackrace Simulation Results"));
        let rows = text.lines().filter(|line| line.starts_with("| ")).count();
        assert_eq!(rows, 4);
        assert!(text.contains("| 1 | Beta, the Second | 40 | 40.00% |"));
    }

    #[test]
    fn csv_report_quotes_fields_with_commas() {
        let text = render(|out| generate_csv_report(out, &sample_report()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "key,name,weight,wins,win_rate,expected_value,std_error");
        assert!(lines[1].starts_with("a,Alpha,1,60,0.600000,0.600000,"));
        assert!(lines[2].starts_with("b,\"Beta, the Second\",2,40,"));
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn shared_stream_reports_have_no_seed() {
        let mut report = sample_report();
        report.seed = None;
        let text = render(|out| generate_markdown_report(out, &report));
        assert!(text.contains("- **Seed**: shared stream"));
    }
}

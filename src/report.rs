// Plain-text ranking export with summary statistics.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::ranking::{format_time, RankingEntry, RankingKind};

const RULE: &str = "===============================================";

/// Render a ranking list as a printable report.
pub fn render(kind: RankingKind, entries: &[RankingEntry], now: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "        RANKING - {}", kind.title());
    let _ = writeln!(out, "        Exported: {}", now.format("%d/%m/%Y %H:%M:%S"));
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out);

    let _ = writeln!(out, "Position | {:<20} | Result", "Name");
    let _ = writeln!(out, "---------|----------------------|-------");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "{:>8} | {:<20} | {}", i + 1, entry.name(), result_cell(entry));
    }
    let _ = writeln!(out);

    banner(&mut out, "SUMMARY");
    let _ = writeln!(out);
    let _ = writeln!(out, "Participants: {}", entries.len());
    if kind.is_maze() {
        maze_summary(&mut out, entries);
    } else {
        quiz_summary(&mut out, entries);
    }
    let _ = writeln!(out);
    banner(&mut out, "END OF RANKING");
    out
}

fn banner(out: &mut String, title: &str) {
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "        {title}");
    let _ = writeln!(out, "{RULE}");
}

fn result_cell(entry: &RankingEntry) -> String {
    match entry {
        RankingEntry::Maze(m) => m
            .time_string
            .clone()
            .unwrap_or_else(|| format_time(m.time)),
        RankingEntry::Quiz(q) => format!("{}/{} ({}%)", q.score, q.total, q.percentage),
    }
}

fn maze_summary(out: &mut String, entries: &[RankingEntry]) {
    let times: Vec<u64> = entries.iter().filter_map(RankingEntry::time).collect();
    let (Some(best), Some(worst)) = (times.iter().min(), times.iter().max()) else {
        let _ = writeln!(out, "Best time: -");
        let _ = writeln!(out, "Average time: -");
        let _ = writeln!(out, "Worst time: -");
        return;
    };
    let average = times.iter().sum::<u64>() / times.len() as u64;
    let _ = writeln!(out, "Best time: {}", format_time(*best));
    let _ = writeln!(out, "Average time: {}", format_time(average));
    let _ = writeln!(out, "Worst time: {}", format_time(*worst));
}

fn quiz_summary(out: &mut String, entries: &[RankingEntry]) {
    let pcts: Vec<u32> = entries.iter().filter_map(RankingEntry::percentage).collect();
    let average = if pcts.is_empty() {
        0
    } else {
        (f64::from(pcts.iter().sum::<u32>()) / pcts.len() as f64).round() as u32
    };
    let _ = writeln!(out, "Average score: {average}%");
    let _ = writeln!(out, "Highest score: {}%", pcts.iter().max().copied().unwrap_or(0));
    let _ = writeln!(out, "Lowest score: {}%", pcts.iter().min().copied().unwrap_or(0));
}

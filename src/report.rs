use crate::history::Dashboard;
use crate::model::{CompletedWorkout, Profile};
use maud::{Markup, html};
use plotters::prelude::*;
use std::path::Path;

trait FormatOption {
    fn fmt_opt(self) -> String;
}

impl FormatOption for Option<f64> {
    fn fmt_opt(self) -> String {
        self.map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".into())
    }
}

impl FormatOption for f64 {
    fn fmt_opt(self) -> String {
        format!("{:.1}", self)
    }
}

/// Write an HTML history report next to a PNG chart of the last seven days.
pub fn export_history_report<P: AsRef<Path>>(
    path: P,
    dashboard: &Dashboard,
    workouts: &[CompletedWorkout],
    profile: &Profile,
) -> std::io::Result<()> {
    let path = path.as_ref();
    let chart_path = path.with_extension("png");
    let chart_file = match generate_weekly_chart(&dashboard.weekly, &chart_path) {
        Ok(_) => chart_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("")),
        Err(e) => {
            log::error!("Failed to generate chart: {}", e);
            std::ffi::OsStr::new("")
        }
    };
    let markup = build_html(dashboard, workouts, profile, chart_file);
    std::fs::write(path, markup.into_string())
}

fn generate_weekly_chart(
    weekly: &[(String, usize)],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    if weekly.is_empty() {
        root.present()?;
        return Ok(());
    }
    let max = weekly.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let mut chart = ChartBuilder::on(&root)
        .caption("Workouts This Week", ("sans-serif", 25))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d((0..weekly.len()).into_segmented(), 0..max)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Day")
        .y_desc("Workouts")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => weekly
                .get(*i)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.filled())
            .margin(10)
            .data(weekly.iter().enumerate().map(|(i, (_, n))| (i, *n))),
    )?;
    root.present()?;
    Ok(())
}

fn build_html(
    dashboard: &Dashboard,
    workouts: &[CompletedWorkout],
    profile: &Profile,
    chart_file: &std::ffi::OsStr,
) -> Markup {
    let name = if profile.username.is_empty() {
        "Athlete"
    } else {
        profile.username.as_str()
    };
    html! {
        html {
            head { meta charset="utf-8"; title { "Workout History" } }
            body {
                h1 { "Summary for " (name) }
                table border="1" {
                    tr { th { "Total Workouts" } td { (dashboard.total_workouts) } }
                    tr { th { "Streak" } td { (dashboard.streak) " days" } }
                    tr { th { "Level" } td { (dashboard.level) " (" (dashboard.level_xp) " / 1000 XP)" } }
                    tr { th { "Total XP" } td { (dashboard.total_xp) } }
                    tr { th { "Calories Today" } td { (dashboard.today_calories.map(|c| c.to_string()).unwrap_or_else(|| "-".into())) } }
                }
                ul {
                    @for line in &dashboard.insights {
                        li { (line) }
                    }
                }
                h1 { "Workouts" }
                table border="1" {
                    tr { th { "Date" } th { "Split" } th { "Day" } th { "Minutes" } th { "Sets" } th { "Volume" } th { "Calories" } th { "XP" } }
                    @for w in workouts {
                        tr {
                            td { (w.date.get(..10).unwrap_or(&w.date)) }
                            td { (w.split) }
                            td { (w.day) }
                            td { (w.duration) }
                            td { (w.total_sets) }
                            td { (w.total_volume.fmt_opt()) }
                            td { (w.calories_burned) }
                            td { (w.xp) }
                        }
                    }
                }
                h1 { "Best Sets" }
                table border="1" {
                    tr { th { "Exercise" } th { "Weight" } th { "Reps" } }
                    @for (ex, weight, reps) in best_sets(workouts) {
                        tr {
                            td { (ex) }
                            td { (weight.fmt_opt()) }
                            td { (reps.fmt_opt()) }
                        }
                    }
                }
                h1 { "This Week" }
                @if chart_file.is_empty() {
                    p { "Chart unavailable" }
                } @else {
                    img src=(chart_file.to_string_lossy());
                }
            }
        }
    }
}

/// Heaviest set of each logged exercise as `(name, weight, reps)`.
pub fn best_sets(workouts: &[CompletedWorkout]) -> Vec<(String, Option<f64>, Option<f64>)> {
    let mut best: Vec<(String, Option<f64>, Option<f64>)> = Vec::new();
    for ex in workouts.iter().flat_map(|w| &w.exercises) {
        for set in &ex.sets {
            match best.iter_mut().find(|(name, _, _)| *name == ex.name) {
                Some(entry) => {
                    if set.weight.unwrap_or(0.0) > entry.1.unwrap_or(0.0) {
                        entry.1 = set.weight;
                        entry.2 = set.reps;
                    }
                }
                None => best.push((ex.name.clone(), set.weight, set.reps)),
            }
        }
    }
    best
}

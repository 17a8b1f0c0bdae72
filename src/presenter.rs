use crate::model::{LoggedSet, PrEntry};

/// What the exercise list shows for one exercise of the day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseView {
    pub name: String,
    pub notes: String,
    /// Last logged weight and reps.
    pub last: Option<(f64, f64)>,
    pub best: Option<PrEntry>,
    pub sets: Vec<LoggedSet>,
}

/// Output side of the tracker. The core never renders anything itself.
pub trait Presenter {
    fn render_exercise_list(&mut self, split: &str, day: &str, exercises: &[ExerciseView]);

    /// Transient, non-blocking message.
    fn notify(&mut self, message: &str);

    /// Rest-over signal (sound/vibration on a device).
    fn alert(&mut self, message: &str);

    fn render_timers(&mut self, _workout_secs: u64, _rest_remaining: Option<u32>) {}
}

/// Presenter that only writes to the log.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn render_exercise_list(&mut self, split: &str, day: &str, exercises: &[ExerciseView]) {
        log::info!("{day} - {split}: {} exercises", exercises.len());
    }

    fn notify(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn alert(&mut self, message: &str) {
        log::warn!("{message}");
    }
}

/// Format seconds as `MM:SS`; minutes keep growing past an hour.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `"100kg x 5"`, or `None` when either value is missing or zero.
pub fn format_last(last: Option<(f64, f64)>) -> Option<String> {
    match last {
        Some((w, r)) if w > 0.0 && r > 0.0 => Some(format!("{w}kg x {r}")),
        _ => None,
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Keeps everything it is asked to show.
    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        pub lists: Vec<(String, String, Vec<ExerciseView>)>,
        pub notices: Vec<String>,
        pub alerts: Vec<String>,
        pub timers: Vec<(u64, Option<u32>)>,
    }

    impl Presenter for RecordingPresenter {
        fn render_exercise_list(&mut self, split: &str, day: &str, exercises: &[ExerciseView]) {
            self.lists
                .push((split.to_string(), day.to_string(), exercises.to_vec()));
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn render_timers(&mut self, workout_secs: u64, rest_remaining: Option<u32>) {
            self.timers.push((workout_secs, rest_remaining));
        }
    }
}

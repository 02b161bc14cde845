//! Plain-text rendering of progress views.

use coursetrack_core::ProgressView;

/// Width of the progress bar in characters
const BAR_WIDTH: usize = 20;

/// Longest lesson title shown before truncation
const MAX_TITLE_LENGTH: usize = 48;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// `[#####---------------]` style bar for a 0-100 percentage
pub fn progress_bar(percent: u8) -> String {
    let filled = (percent.min(100) as usize * BAR_WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn render_view(view: &ProgressView) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} ({})\n", view.course_title, view.course_id));
    let student = view.student.full_name();
    if !student.is_empty() {
        out.push_str(&format!("Student: {}\n", student));
    }
    out.push_str(&format!(
        "{} {}%  {} of {} lessons, {} remaining\n",
        progress_bar(view.percent),
        view.percent,
        view.stats.completed,
        view.stats.total,
        view.stats.remaining
    ));

    for module in &view.modules {
        out.push_str(&format!(
            "\n{} ({}/{})\n",
            module.title,
            module.completed_count(),
            module.lessons.len()
        ));
        for lesson in &module.lessons {
            let mark = if lesson.completed { "x" } else { " " };
            out.push_str(&format!(
                "  [{}] {}\n",
                mark,
                truncate_string(&lesson.title, MAX_TITLE_LENGTH)
            ));
        }
    }

    if let Some((module, lesson_id)) = view.next_lesson() {
        out.push_str(&format!("\nNext up: {} in {}\n", lesson_id, module.title));
    }

    out
}

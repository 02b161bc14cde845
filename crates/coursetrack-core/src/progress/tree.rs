use crate::models::{Course, Lesson, Module, RawCourse, RawModule};

/// Normalize a raw course into its canonical order.
///
/// Modules, and lessons within each module, are ordered ascending by `sort`
/// (missing = 0). The sort is stable, so equal keys keep arrival order.
pub fn build_course_tree(raw: RawCourse) -> Course {
    let mut modules: Vec<Module> = raw
        .modules
        .unwrap_or_default()
        .into_iter()
        .map(build_module)
        .collect();
    modules.sort_by_key(|m| m.sort);

    Course {
        id: raw.id,
        title: raw.title.unwrap_or_default(),
        modules,
    }
}

fn build_module(raw: RawModule) -> Module {
    let mut lessons: Vec<Lesson> = raw
        .lessons
        .unwrap_or_default()
        .into_iter()
        .map(Lesson::from)
        .collect();
    lessons.sort_by_key(|l| l.sort);

    Module {
        id: raw.id,
        title: raw.title.unwrap_or_default(),
        sort: raw.sort.unwrap_or(0),
        lessons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawLesson;

    fn module_ids(course: &Course) -> Vec<&str> {
        course.modules.iter().map(|m| m.id.as_str()).collect()
    }

    fn lesson_ids(module: &Module) -> Vec<&str> {
        module.lessons.iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_modules_sorted_ascending() {
        let raw = RawCourse::new("c1", "Course")
            .with_module(RawModule::new("second", "B", Some(2)))
            .with_module(RawModule::new("first", "A", Some(1)));

        let course = build_course_tree(raw);
        assert_eq!(module_ids(&course), vec!["first", "second"]);
    }

    #[test]
    fn test_equal_sort_keeps_arrival_order() {
        let raw = RawCourse::new("c1", "Course")
            .with_module(RawModule::new("a", "A", Some(1)))
            .with_module(RawModule::new("b", "B", None))
            .with_module(RawModule::new("c", "C", Some(1)))
            .with_module(RawModule::new("d", "D", Some(0)));

        let course = build_course_tree(raw);
        // b (missing = 0) and d (0) tie; a and c tie
        assert_eq!(module_ids(&course), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_lessons_sorted_within_module() {
        let raw = RawCourse::new("c1", "Course").with_module(
            RawModule::new("m1", "M", Some(1))
                .with_lesson(RawLesson::new("L3", "three", Some(3)))
                .with_lesson(RawLesson::new("L1", "one", Some(1)))
                .with_lesson(RawLesson::new("L0", "zero", None))
                .with_lesson(RawLesson::new("L1b", "one again", Some(1))),
        );

        let course = build_course_tree(raw);
        assert_eq!(lesson_ids(&course.modules[0]), vec!["L0", "L1", "L1b", "L3"]);
        assert_eq!(course.modules[0].lessons[0].sort, 0);
    }

    #[test]
    fn test_negative_sort_orders_first() {
        let raw = RawCourse::new("c1", "Course")
            .with_module(RawModule::new("a", "A", None))
            .with_module(RawModule::new("b", "B", Some(-5)));
        assert_eq!(module_ids(&build_course_tree(raw)), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_arrays_yield_empty_tree() {
        let raw = RawCourse {
            id: "c1".into(),
            title: None,
            modules: None,
        };
        let course = build_course_tree(raw);
        assert!(course.modules.is_empty());
        assert_eq!(course.title, "");

        let raw = RawCourse::new("c1", "Course").with_module(RawModule {
            id: "m1".into(),
            title: None,
            sort: None,
            lessons: None,
        });
        let course = build_course_tree(raw);
        assert_eq!(course.modules.len(), 1);
        assert!(course.modules[0].lessons.is_empty());
        assert_eq!(course.lesson_count(), 0);
    }
}

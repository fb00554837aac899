use serde::{Deserialize, Serialize};

/// What the player side should do while a segment is active.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CensorAction {
    Blur,
    Mute,
    Pause,
    SwitchScene,
}

/// One censored window on the movie timeline, in player seconds.
///
/// A segment covers the half open window `[start, end)`, so back to back
/// segments never overlap on their shared boundary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub action: CensorAction,
}

impl Segment {
    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position < self.end
    }
}

/// The segment list for one movie.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub segments: Vec<Segment>,
}

impl Schedule {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Whether any segment with this action covers the position.
    pub fn is_active(&self, action: CensorAction, position: f64) -> bool {
        self.segments
            .iter()
            .any(|segment| segment.action == action && segment.contains(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, action: CensorAction) -> Segment {
        Segment { start, end, action }
    }

    #[test]
    fn window_start_is_inside_the_end_is_not() {
        let blur = segment(10.0, 20.0, CensorAction::Blur);

        assert!(!blur.contains(9.99));
        assert!(blur.contains(10.0));
        assert!(blur.contains(19.99));
        assert!(!blur.contains(20.0));
    }

    #[test]
    fn overlapping_segments_answer_per_action() {
        let schedule = Schedule::new(vec![
            segment(0.0, 5.0, CensorAction::Blur),
            segment(3.0, 8.0, CensorAction::Mute),
            segment(3.0, 4.0, CensorAction::Blur),
        ]);

        assert!(schedule.is_active(CensorAction::Blur, 3.5));
        assert!(schedule.is_active(CensorAction::Mute, 3.5));
        assert!(!schedule.is_active(CensorAction::Pause, 3.5));

        assert!(schedule.is_active(CensorAction::Blur, 4.5));
        assert!(!schedule.is_active(CensorAction::Blur, 5.0));
        assert!(schedule.is_active(CensorAction::Mute, 5.0));
    }

    #[test]
    fn segments_parse_from_camel_case_json() {
        let json = r#"[{"start":12.5,"end":18.0,"action":"switchScene"},{"start":30.0,"end":31.0,"action":"mute"}]"#;

        let segments: Vec<Segment> = serde_json::from_str(json).unwrap();

        assert_eq!(2, segments.len());
        assert_eq!(CensorAction::SwitchScene, segments[0].action);
        assert_eq!(CensorAction::Mute, segments[1].action);
        assert_eq!(12.5, segments[0].start);
    }
}

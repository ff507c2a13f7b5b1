use serde::{Deserialize, Serialize};

// Tap timing windows (absolute seconds, symmetric around the note time).
pub const MARVELOUS_WINDOW: f32 = 0.0225;
pub const PERFECT_WINDOW: f32 = 0.0450;
pub const GREAT_WINDOW: f32 = 0.0900;
pub const GOOD_WINDOW: f32 = 0.1350;

/// Points awarded by the best tier; the denominator of the accuracy formula.
pub const MAX_NOTE_POINTS: u32 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JudgeGrade {
    Marvelous,
    Perfect,
    Great,
    Good,
    Miss,
}

/// Maps an absolute timing error to a tier. `None` means the press was
/// outside the widest window: no note is consumed and nothing is scored.
pub fn grade_for_offset(abs_error: f32) -> Option<JudgeGrade> {
    if abs_error <= MARVELOUS_WINDOW {
        Some(JudgeGrade::Marvelous)
    } else if abs_error <= PERFECT_WINDOW {
        Some(JudgeGrade::Perfect)
    } else if abs_error <= GREAT_WINDOW {
        Some(JudgeGrade::Great)
    } else if abs_error <= GOOD_WINDOW {
        Some(JudgeGrade::Good)
    } else {
        None
    }
}

pub const fn points_for(grade: JudgeGrade) -> u32 {
    match grade {
        JudgeGrade::Marvelous => 100,
        JudgeGrade::Perfect => 98,
        JudgeGrade::Great => 65,
        JudgeGrade::Good => 25,
        JudgeGrade::Miss => 0,
    }
}

/// One judged note: the tier plus the signed timing error (negative = early).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Judgment {
    pub note_index: usize,
    pub grade: JudgeGrade,
    pub time_error_ms: f32,
}

/// Letter grade derived from accuracy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    AAA,
    AA,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_accuracy(accuracy: f64) -> Grade {
        if accuracy >= 1.00 {
            Grade::AAA
        } else if accuracy >= 0.99 {
            Grade::AA
        } else if accuracy >= 0.96 {
            Grade::A
        } else if accuracy >= 0.89 {
            Grade::B
        } else if accuracy >= 0.80 {
            Grade::C
        } else if accuracy >= 0.65 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

use crate::game::judgment::{points_for, Grade, JudgeGrade, MAX_NOTE_POINTS};
use serde::Serialize;

/// Per-tier judgment tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JudgmentCounts {
    pub marvelous: u32,
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentCounts {
    pub fn increment(&mut self, grade: JudgeGrade) {
        match grade {
            JudgeGrade::Marvelous => self.marvelous += 1,
            JudgeGrade::Perfect => self.perfect += 1,
            JudgeGrade::Great => self.great += 1,
            JudgeGrade::Good => self.good += 1,
            JudgeGrade::Miss => self.miss += 1,
        }
    }

    pub fn count(&self, grade: JudgeGrade) -> u32 {
        match grade {
            JudgeGrade::Marvelous => self.marvelous,
            JudgeGrade::Perfect => self.perfect,
            JudgeGrade::Great => self.great,
            JudgeGrade::Good => self.good,
            JudgeGrade::Miss => self.miss,
        }
    }

    /// Notes hit plus notes missed.
    pub fn judged(&self) -> u32 {
        self.marvelous + self.perfect + self.great + self.good + self.miss
    }
}

/// Running score state. Pure accumulation and derived values; no timing
/// logic lives here.
#[derive(Clone, Debug)]
pub struct GameScore {
    judgments: JudgmentCounts,
    score: u32,
    max_possible_score: u32,
    combo: u32,
    max_combo: u32,
    accuracy: f64,
    grade: Grade,
}

impl GameScore {
    pub fn new(note_count: usize) -> Self {
        Self {
            judgments: JudgmentCounts::default(),
            score: 0,
            max_possible_score: note_count as u32 * MAX_NOTE_POINTS,
            combo: 0,
            max_combo: 0,
            // 100% until the first note is judged.
            accuracy: 1.0,
            grade: Grade::AAA,
        }
    }

    /// Applies one judgment: tier count, points, combo law, then the derived
    /// accuracy and letter grade.
    pub fn record(&mut self, grade: JudgeGrade) {
        self.judgments.increment(grade);
        self.score += points_for(grade);

        if grade == JudgeGrade::Miss {
            self.combo = 0;
        } else {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }

        let judged = self.judgments.judged();
        if judged > 0 {
            self.accuracy = self.score as f64 / (judged as f64 * MAX_NOTE_POINTS as f64);
        }
        self.grade = Grade::from_accuracy(self.accuracy);
    }

    pub fn judgments(&self) -> &JudgmentCounts {
        &self.judgments
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_possible_score(&self) -> u32 {
        self.max_possible_score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            score: self.score,
            combo: self.combo,
            max_combo: self.max_combo,
            accuracy: self.accuracy,
            grade: self.grade,
            judgments: self.judgments,
        }
    }

    /// The immutable end-of-session summary handed to the results screen.
    pub fn finalize(&self) -> Results {
        let j = self.judgments;
        let full_combo = j.miss == 0;
        let perfect_full_combo = full_combo && j.great == 0 && j.good == 0;
        let top_full_combo = perfect_full_combo && j.perfect == 0;
        Results {
            score: self.score,
            max_possible_score: self.max_possible_score,
            accuracy: self.accuracy,
            grade: self.grade,
            max_combo: self.max_combo,
            judgments: j,
            full_combo,
            perfect_full_combo,
            top_full_combo,
        }
    }
}

/// Lightweight per-tick score notification payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreSnapshot {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub accuracy: f64,
    pub grade: Grade,
    pub judgments: JudgmentCounts,
}

/// Final results snapshot. The three booleans are hierarchical: each implies
/// the previous.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Results {
    pub score: u32,
    pub max_possible_score: u32,
    pub accuracy: f64,
    pub grade: Grade,
    pub max_combo: u32,
    pub judgments: JudgmentCounts,
    pub full_combo: bool,
    pub perfect_full_combo: bool,
    pub top_full_combo: bool,
}

#[cfg(test)]
mod tests {
    use super::GameScore;
    use crate::game::judgment::{Grade, JudgeGrade};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn accuracy_starts_at_one_and_holds_until_first_judgment() {
        let score = GameScore::new(10);
        assert_approx_eq!(score.accuracy(), 1.0);
        assert_eq!(score.grade(), Grade::AAA);
        assert_eq!(score.max_possible_score(), 1000);
    }

    #[test]
    fn combo_increments_on_hits_and_resets_to_zero_on_miss() {
        let mut score = GameScore::new(6);
        score.record(JudgeGrade::Marvelous);
        score.record(JudgeGrade::Perfect);
        score.record(JudgeGrade::Good);
        assert_eq!(score.combo(), 3);

        score.record(JudgeGrade::Miss);
        assert_eq!(score.combo(), 0);
        assert_eq!(score.max_combo(), 3);

        score.record(JudgeGrade::Great);
        assert_eq!(score.combo(), 1);
        assert_eq!(score.max_combo(), 3);
    }

    #[test]
    fn accuracy_is_score_over_judged_times_hundred() {
        let mut score = GameScore::new(4);
        score.record(JudgeGrade::Marvelous); // 100
        score.record(JudgeGrade::Perfect); // 98
        assert_approx_eq!(score.accuracy(), 198.0 / 200.0);

        score.record(JudgeGrade::Miss); // 0
        assert_approx_eq!(score.accuracy(), 198.0 / 300.0);
    }

    #[test]
    fn accuracy_stays_within_unit_interval() {
        let mut score = GameScore::new(100);
        for _ in 0..50 {
            score.record(JudgeGrade::Marvelous);
        }
        assert!(score.accuracy() <= 1.0);
        for _ in 0..50 {
            score.record(JudgeGrade::Miss);
        }
        assert!(score.accuracy() >= 0.0);
    }

    #[test]
    fn full_combo_booleans_are_hierarchical() {
        // All Marvelous: every flag set.
        let mut score = GameScore::new(3);
        for _ in 0..3 {
            score.record(JudgeGrade::Marvelous);
        }
        let results = score.finalize();
        assert!(results.full_combo && results.perfect_full_combo && results.top_full_combo);

        // A Perfect demotes to perfect-full-combo.
        let mut score = GameScore::new(2);
        score.record(JudgeGrade::Marvelous);
        score.record(JudgeGrade::Perfect);
        let results = score.finalize();
        assert!(results.full_combo && results.perfect_full_combo);
        assert!(!results.top_full_combo);

        // A Great demotes to plain full combo.
        let mut score = GameScore::new(2);
        score.record(JudgeGrade::Marvelous);
        score.record(JudgeGrade::Great);
        let results = score.finalize();
        assert!(results.full_combo);
        assert!(!results.perfect_full_combo);

        // A miss clears everything.
        let mut score = GameScore::new(1);
        score.record(JudgeGrade::Miss);
        let results = score.finalize();
        assert!(!results.full_combo && !results.perfect_full_combo && !results.top_full_combo);
    }
}

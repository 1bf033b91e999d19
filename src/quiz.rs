// 🎲 Quiz Selector - draws one unseen question at random
//
// The unseen set is computed first and sampled once, so a draw always
// terminates and is uniform over exactly the questions not yet served.

use crate::entities::Question;
use crate::store::QuestionStore;
use anyhow::Result;
use rand::Rng;
use std::collections::HashSet;

/// Which questions a quiz draws from
///
/// On the wire category id `0` means every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(i64),
}

impl From<i64> for CategoryFilter {
    fn from(id: i64) -> Self {
        if id == 0 {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(id)
        }
    }
}

/// Outcome of a draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizDraw {
    Next(Question),
    /// Every candidate has already been served: the quiz is complete
    Exhausted,
}

impl QuizDraw {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, QuizDraw::Exhausted)
    }

    pub fn into_question(self) -> Option<Question> {
        match self {
            QuizDraw::Next(question) => Some(question),
            QuizDraw::Exhausted => None,
        }
    }
}

/// Candidate set for a quiz after category filtering
pub fn resolve_candidates(store: &dyn QuestionStore, filter: CategoryFilter) -> Result<Vec<Question>> {
    match filter {
        CategoryFilter::All => store.fetch_all(),
        CategoryFilter::Only(category_id) => store.fetch_by_category(category_id),
    }
}

/// Draw the next question using the thread-local RNG
pub fn select_next(candidates: Vec<Question>, previous: &HashSet<i64>) -> QuizDraw {
    select_next_with(candidates, previous, &mut rand::thread_rng())
}

/// Draw the next question with a caller-supplied RNG
pub fn select_next_with<R: Rng + ?Sized>(
    candidates: Vec<Question>,
    previous: &HashSet<i64>,
    rng: &mut R,
) -> QuizDraw {
    let mut remaining: Vec<Question> = candidates
        .into_iter()
        .filter(|q| !previous.contains(&q.id))
        .collect();

    if remaining.is_empty() {
        return QuizDraw::Exhausted;
    }

    let index = rng.gen_range(0..remaining.len());
    QuizDraw::Next(remaining.swap_remove(index))
}

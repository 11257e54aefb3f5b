//! Marks the cards of the "Done" list as complete

use std::sync::Arc;

use crate::card::CardId;
use crate::error::SyncResult;
use crate::scheduler::progress::JobProgress;
use crate::traits::BoardClient;

/// Marks every due-dated card of the "Done" list as due-complete.
///
/// This keeps no state between calls, and can be run any number of times.
#[derive(Clone)]
pub struct DoneCloser {
    board: Arc<dyn BoardClient>,
    done_list: String,
}

impl DoneCloser {
    pub fn new(board: Arc<dyn BoardClient>, done_list: String) -> Self {
        Self { board, done_list }
    }

    /// Returns the cards that have just been marked complete
    pub async fn mark_done(&self, progress: &mut JobProgress) -> SyncResult<Vec<CardId>> {
        progress.info("Fetching done cards");
        let done_list = self.board.get_list(&self.done_list).await?;

        let mut completed = Vec::new();
        for card in done_list.cards {
            if card.due.is_none() || card.due_complete {
                continue;
            }
            progress.debug(&format!("Setting card {} due complete", card.name));
            self.board.set_due_complete(&card.id).await?;
            completed.push(card.id);
        }

        progress.info(&format!("Update complete, {} cards marked complete", completed.len()));
        Ok(completed)
    }
}

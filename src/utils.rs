//! Some utility functions

use crate::card::{Card, FieldValue};
use crate::error::SyncResult;
use crate::traits::BoardClient;

/// A debug utility that pretty-prints some lists of a board
pub async fn print_lists(board: &dyn BoardClient, list_names: &[&str]) -> SyncResult<()> {
    for name in list_names {
        let list = board.get_list(name).await?;
        println!("LIST {}\t{}", list.name, list.id);
        for card in &list.cards {
            print_card(card);
        }
    }
    Ok(())
}

pub fn print_card(card: &Card) {
    let completion = match (card.due, card.due_complete) {
        (None, _) => " ",
        (Some(_), false) => ".",
        (Some(_), true) => "✓",
    };
    let fields: Vec<String> = card.custom_fields.iter()
        .map(|(name, value)| match value {
            FieldValue::Text(text) => format!("{}={}", name, text),
            FieldValue::Number(number) => format!("{}={}", name, number),
        })
        .collect();
    println!("    {} {}\t{}\t{}", completion, card.name, card.id, fields.join(" "));
}

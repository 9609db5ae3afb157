//! High score persistence
//!
//! The game keeps its three best scores at the very start of the flash
//! array. Loading accounts for the leading stale byte every flash read
//! carries; storing rewrites the containing sector.

use crate::error::Result;
use crate::flash::{Flash, FlashAddress};
use crate::usci::SerialUnit;

/// Number of scores kept.
pub const SCORE_COUNT: usize = 3;

/// Where the score table lives in the flash array.
pub const SCORE_ADDRESS: FlashAddress = FlashAddress(0);

/// Load the score table.
pub fn load<U: SerialUnit>(flash: &mut Flash<'_, U>) -> Result<[u8; SCORE_COUNT]> {
    let mut buf = [0u8; SCORE_COUNT + 1];
    flash.read(SCORE_ADDRESS, &mut buf)?;
    let mut scores = [0u8; SCORE_COUNT];
    scores.copy_from_slice(&buf[1..]);
    Ok(scores)
}

/// Store the score table, erasing the sector it lives in.
pub fn store<U: SerialUnit>(flash: &mut Flash<'_, U>, scores: &[u8; SCORE_COUNT]) -> Result<()> {
    flash.write(SCORE_ADDRESS, scores)
}

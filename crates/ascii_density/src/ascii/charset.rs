use super::font::{FIRST_PRINTABLE, LAST_PRINTABLE};
use super::matcher::{printable_code, BrightnessMatcher, RoundingPolicy};
use crate::AsciiError;

const PRINTABLE_COUNT: usize = (LAST_PRINTABLE - FIRST_PRINTABLE + 1) as usize;

/// Characters a fresh session starts with.
pub const DEFAULT_CHARSET: std::ops::RangeInclusive<char> = '0'..='9';

/// The session's active characters together with the matcher built from them.
///
/// Every flagged code is present in exactly one matcher bucket and every
/// unflagged code in none; all mutation goes through this type to keep it so.
#[derive(Debug)]
pub struct ActiveCharset {
    flags: [bool; PRINTABLE_COUNT],
    matcher: BrightnessMatcher,
}

impl ActiveCharset {
    pub fn new<I>(initial: I) -> Result<Self, AsciiError>
    where
        I: IntoIterator<Item = char>,
    {
        let initial: Vec<char> = initial.into_iter().collect();
        let matcher = BrightnessMatcher::new(initial.iter().copied())?;
        Ok(Self::from_matcher_with(matcher, &initial))
    }

    /// Wrap an existing matcher, flagging exactly the characters it holds.
    pub fn from_matcher(matcher: BrightnessMatcher) -> Self {
        let active: Vec<char> =
            matcher.entries().flat_map(|entry| entry.characters.into_iter()).collect();
        Self::from_matcher_with(matcher, &active)
    }

    fn from_matcher_with(matcher: BrightnessMatcher, active: &[char]) -> Self {
        let mut flags = [false; PRINTABLE_COUNT];
        for &c in active {
            if let Ok(code) = printable_code(c) {
                flags[slot(code)] = true;
            }
        }
        Self { flags, matcher }
    }

    /// Returns `true` if `c` was not active before.
    pub fn add(&mut self, c: char) -> Result<bool, AsciiError> {
        let code = printable_code(c)?;
        self.matcher.add_character(c)?;
        Ok(!std::mem::replace(&mut self.flags[slot(code)], true))
    }

    /// Returns `true` if `c` was active before.
    pub fn remove(&mut self, c: char) -> Result<bool, AsciiError> {
        let code = printable_code(c)?;
        self.matcher.remove_character(c)?;
        Ok(std::mem::replace(&mut self.flags[slot(code)], false))
    }

    /// Add every character between `a` and `b` inclusive, in either order.
    ///
    /// Both bounds are validated before anything changes.
    pub fn add_range(&mut self, a: char, b: char) -> Result<usize, AsciiError> {
        let (start, end) = ordered_bounds(a, b)?;
        let mut added = 0;
        for code in start..=end {
            if self.add(char::from(code))? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove every character between `a` and `b` inclusive, in either order.
    pub fn remove_range(&mut self, a: char, b: char) -> Result<usize, AsciiError> {
        let (start, end) = ordered_bounds(a, b)?;
        let mut removed = 0;
        for code in start..=end {
            if self.remove(char::from(code))? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn add_all(&mut self) -> usize {
        (FIRST_PRINTABLE..=LAST_PRINTABLE)
            .filter(|&code| self.add(char::from(code)).unwrap_or(false))
            .count()
    }

    pub fn remove_all(&mut self) -> usize {
        (FIRST_PRINTABLE..=LAST_PRINTABLE)
            .filter(|&code| self.remove(char::from(code)).unwrap_or(false))
            .count()
    }

    pub fn contains(&self, c: char) -> bool {
        printable_code(c).is_ok_and(|code| self.flags[slot(code)])
    }

    /// Active characters in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|&(_, &active)| active)
            .map(|(index, _)| char::from(FIRST_PRINTABLE + index as u8))
    }

    pub fn len(&self) -> usize {
        self.flags.iter().filter(|&&active| active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_rounding_policy(&mut self, policy: RoundingPolicy) {
        self.matcher.set_rounding_policy(policy);
    }

    pub fn matcher(&self) -> &BrightnessMatcher {
        &self.matcher
    }
}

fn slot(code: u8) -> usize {
    (code - FIRST_PRINTABLE) as usize
}

fn ordered_bounds(a: char, b: char) -> Result<(u8, u8), AsciiError> {
    let a = printable_code(a)?;
    let b = printable_code(b)?;
    Ok((a.min(b), a.max(b)))
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::trace;

use super::font::{Font8x8, GlyphRasterizer, FIRST_PRINTABLE, LAST_PRINTABLE};
use crate::AsciiError;

/// Slack allowed when deciding that a value is equidistant from two keys.
///
/// Denormalization is not exact in binary floating point; without this a
/// midpoint can drift a few ulps toward either side.
const TIE_TOLERANCE: f64 = 1e-9;

/// Rule applied when a target density falls between two bucket keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundingPolicy {
    /// Closest key, ties toward the lower one.
    #[default]
    Abs,
    /// Always the key above.
    Up,
    /// Always the key below.
    Down,
}

impl RoundingPolicy {
    pub fn name(self) -> &'static str {
        match self {
            RoundingPolicy::Abs => "abs",
            RoundingPolicy::Up => "up",
            RoundingPolicy::Down => "down",
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = AsciiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abs" => Ok(RoundingPolicy::Abs),
            "up" => Ok(RoundingPolicy::Up),
            "down" => Ok(RoundingPolicy::Down),
            _ => Err(AsciiError::UnknownRoundingPolicy(s.to_owned())),
        }
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw glyph density usable as an ordered map key.
#[derive(Clone, Copy, Debug)]
struct Density(f64);

impl PartialEq for Density {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Density {}

impl PartialOrd for Density {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Density {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One density key and every active character that produces it.
#[derive(Clone, Debug, PartialEq)]
pub struct BrightnessEntry {
    pub density: f64,
    /// Characters in ascending code order.
    pub characters: Vec<char>,
}

/// Maps target brightness to the active character with the nearest ink density.
///
/// Densities are kept raw (fraction of lit glyph pixels) and a query in
/// `[0, 1]` is stretched onto `[min_density, max_density]` before the
/// nearest-key search, so the darkest and brightest active characters always
/// cover the full brightness range.
pub struct BrightnessMatcher {
    buckets: BTreeMap<Density, BTreeSet<u8>>,
    /// `(min, max)` over the keys of `buckets`, `None` while empty.
    extremes: Option<(f64, f64)>,
    /// Raw density per ASCII code, filled the first time a code is seen.
    densities: [Option<f64>; LAST_PRINTABLE as usize + 1],
    policy: RoundingPolicy,
    rasterizer: Box<dyn GlyphRasterizer + Send + Sync>,
    rasterizations: usize,
}

impl BrightnessMatcher {
    /// Matcher over `charset` using the built-in 8×8 font.
    pub fn new<I>(charset: I) -> Result<Self, AsciiError>
    where
        I: IntoIterator<Item = char>,
    {
        Self::with_rasterizer(charset, Font8x8)
    }

    /// Matcher over `charset` measuring glyphs with `rasterizer`.
    ///
    /// Fails without building anything if the charset is empty or holds a
    /// character outside the printable ASCII range.
    pub fn with_rasterizer<I, R>(charset: I, rasterizer: R) -> Result<Self, AsciiError>
    where
        I: IntoIterator<Item = char>,
        R: GlyphRasterizer + Send + Sync + 'static,
    {
        let codes = charset.into_iter().map(printable_code).collect::<Result<Vec<_>, _>>()?;
        if codes.is_empty() {
            return Err(AsciiError::EmptyCharset);
        }

        let mut matcher = Self {
            buckets: BTreeMap::new(),
            extremes: None,
            densities: [None; LAST_PRINTABLE as usize + 1],
            policy: RoundingPolicy::default(),
            rasterizer: Box::new(rasterizer),
            rasterizations: 0,
        };
        for code in codes {
            matcher.insert(code);
        }

        Ok(matcher)
    }

    /// Active character whose density is nearest to `target`.
    ///
    /// `target` must lie in `[0, 1]`. Among characters sharing the chosen
    /// density the one with the smallest code wins.
    pub fn lookup_nearest(&self, target: f64) -> Result<char, AsciiError> {
        if !(0.0..=1.0).contains(&target) {
            return Err(AsciiError::BrightnessOutOfRange(target));
        }
        let (min, max) = self.extremes.ok_or(AsciiError::EmptyMatcher)?;

        // The endpoints map exactly; the stretch can land a few ulps inside.
        let raw = if target >= 1.0 { max } else { (target * (max - min) + min).clamp(min, max) };
        let floor = self.buckets.range(..=Density(raw)).next_back();
        let ceil = self.buckets.range(Density(raw)..).next();

        let bucket = match (floor, ceil) {
            (Some(floor), Some(ceil)) => match self.policy {
                RoundingPolicy::Abs => {
                    if raw - floor.0 .0 <= ceil.0 .0 - raw + TIE_TOLERANCE {
                        floor.1
                    } else {
                        ceil.1
                    }
                },
                RoundingPolicy::Up => ceil.1,
                RoundingPolicy::Down => floor.1,
            },
            (Some((_, only)), None) | (None, Some((_, only))) => only,
            (None, None) => return Err(AsciiError::EmptyMatcher),
        };

        bucket.first().map(|&code| char::from(code)).ok_or(AsciiError::EmptyMatcher)
    }

    pub fn set_rounding_policy(&mut self, policy: RoundingPolicy) {
        self.policy = policy;
    }

    pub fn rounding_policy(&self) -> RoundingPolicy {
        self.policy
    }

    /// Add `c` to the active set.
    ///
    /// Returns `false` if it was already present; membership never duplicates.
    pub fn add_character(&mut self, c: char) -> Result<bool, AsciiError> {
        let code = printable_code(c)?;
        Ok(self.insert(code))
    }

    /// Remove `c` from the active set.
    ///
    /// Returns `false` if it was not present.
    pub fn remove_character(&mut self, c: char) -> Result<bool, AsciiError> {
        let code = printable_code(c)?;
        let Some(density) = self.densities[code as usize] else {
            return Ok(false);
        };

        let key = Density(density);
        let Some(bucket) = self.buckets.get_mut(&key) else {
            return Ok(false);
        };
        if !bucket.remove(&code) {
            return Ok(false);
        }
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }

        if let Some((min, max)) = self.extremes {
            if density == min || density == max {
                self.extremes = self.key_extremes();
            }
        }

        Ok(true)
    }

    pub fn contains(&self, c: char) -> bool {
        let Ok(code) = printable_code(c) else {
            return false;
        };
        self.densities[code as usize]
            .and_then(|density| self.buckets.get(&Density(density)))
            .is_some_and(|bucket| bucket.contains(&code))
    }

    /// Raw density of `c`, if it has been measured.
    pub fn density_of(&self, c: char) -> Option<f64> {
        printable_code(c).ok().and_then(|code| self.densities[code as usize])
    }

    pub fn min_density(&self) -> Option<f64> {
        self.extremes.map(|(min, _)| min)
    }

    pub fn max_density(&self) -> Option<f64> {
        self.extremes.map(|(_, max)| max)
    }

    /// Number of active characters.
    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in ascending density order.
    pub fn entries(&self) -> impl Iterator<Item = BrightnessEntry> + '_ {
        self.buckets.iter().map(|(density, codes)| BrightnessEntry {
            density: density.0,
            characters: codes.iter().map(|&code| char::from(code)).collect(),
        })
    }

    /// Number of glyphs rendered so far.
    pub fn rasterizations(&self) -> usize {
        self.rasterizations
    }

    fn insert(&mut self, code: u8) -> bool {
        let density = self.measure(code);
        if !self.buckets.entry(Density(density)).or_default().insert(code) {
            return false;
        }

        self.extremes = Some(match self.extremes {
            Some((min, max)) => (min.min(density), max.max(density)),
            None => (density, density),
        });
        true
    }

    fn measure(&mut self, code: u8) -> f64 {
        if let Some(density) = self.densities[code as usize] {
            return density;
        }

        let density = self.rasterizer.rasterize(code).density();
        trace!("measured glyph {:?} at density {density}", char::from(code));
        self.rasterizations += 1;
        self.densities[code as usize] = Some(density);
        density
    }

    fn key_extremes(&self) -> Option<(f64, f64)> {
        let min = self.buckets.keys().next()?;
        let max = self.buckets.keys().next_back()?;
        Some((min.0, max.0))
    }
}

impl fmt::Debug for BrightnessMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrightnessMatcher")
            .field("buckets", &self.entries().collect::<Vec<_>>())
            .field("extremes", &self.extremes)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Code of `c` if it is printable ASCII.
pub(crate) fn printable_code(c: char) -> Result<u8, AsciiError> {
    let code = u32::from(c);
    if (u32::from(FIRST_PRINTABLE)..=u32::from(LAST_PRINTABLE)).contains(&code) {
        Ok(code as u8)
    } else {
        Err(AsciiError::CharacterOutOfRange(code))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use super::*;
    use crate::ascii::font::GlyphBitmap;

    /// Ten-pixel glyphs with a chosen number of lit pixels per character.
    struct TenthsFont {
        lit: HashMap<u8, usize>,
        calls: Arc<AtomicUsize>,
    }

    impl TenthsFont {
        fn new(lit: &[(char, usize)]) -> Self {
            let lit = lit.iter().map(|&(c, n)| (c as u8, n)).collect();
            Self { lit, calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    impl GlyphRasterizer for TenthsFont {
        fn rasterize(&self, code: u8) -> GlyphBitmap {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let lit = self.lit.get(&code).copied().unwrap_or(0);
            GlyphBitmap::new(10, 1, (0..10).map(|i| i < lit).collect())
        }
    }

    fn matcher(charset: &str, lit: &[(char, usize)]) -> BrightnessMatcher {
        BrightnessMatcher::with_rasterizer(charset.chars(), TenthsFont::new(lit)).unwrap()
    }

    #[test]
    fn empty_charset_is_rejected() {
        let err = BrightnessMatcher::new(std::iter::empty()).unwrap_err();
        assert!(matches!(err, AsciiError::EmptyCharset));
    }

    #[test]
    fn non_printable_charset_is_rejected() {
        let err = BrightnessMatcher::new("ab\n".chars()).unwrap_err();
        assert!(matches!(err, AsciiError::CharacterOutOfRange(10)));
    }

    #[test]
    fn extremes_follow_initial_keys() {
        let m = matcher("abc", &[('a', 1), ('b', 5), ('c', 9)]);
        assert_eq!(m.min_density(), Some(0.1));
        assert_eq!(m.max_density(), Some(0.9));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn lookup_rejects_out_of_range_targets() {
        let m = matcher("ab", &[('a', 1), ('b', 9)]);
        for target in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(m.lookup_nearest(target), Err(AsciiError::BrightnessOutOfRange(_))));
        }
        assert_eq!(m.lookup_nearest(0.0).unwrap(), 'a');
        assert_eq!(m.lookup_nearest(1.0).unwrap(), 'b');
    }

    #[test]
    fn equal_densities_resolve_to_smallest_code() {
        let lit = [('x', 4), ('b', 4), ('m', 4), ('z', 8)];
        for charset in ["xbmz", "zmbx", "bzxm"] {
            let m = matcher(charset, &lit);
            assert_eq!(m.lookup_nearest(0.0).unwrap(), 'b', "insertion order {charset}");
        }

        let mut m = matcher("z", &lit);
        for c in ['m', 'x', 'b'] {
            m.add_character(c).unwrap();
        }
        assert_eq!(m.lookup_nearest(0.0).unwrap(), 'b');
        m.remove_character('b').unwrap();
        assert_eq!(m.lookup_nearest(0.0).unwrap(), 'm');
    }

    #[test]
    fn rounding_policies_pick_the_expected_side() {
        let mut m = matcher("lh", &[('l', 2), ('h', 8)]);

        assert_eq!(m.lookup_nearest(0.5).unwrap(), 'l');
        m.set_rounding_policy(RoundingPolicy::Up);
        assert_eq!(m.lookup_nearest(0.5).unwrap(), 'h');
        m.set_rounding_policy(RoundingPolicy::Down);
        assert_eq!(m.lookup_nearest(0.5).unwrap(), 'l');
    }

    #[test]
    fn abs_policy_picks_the_closer_key() {
        let m = matcher("abc", &[('a', 0), ('b', 3), ('c', 10)]);
        // raw == target here since the keys span [0, 1].
        assert_eq!(m.lookup_nearest(0.2).unwrap(), 'b');
        assert_eq!(m.lookup_nearest(0.6).unwrap(), 'b');
        assert_eq!(m.lookup_nearest(0.7).unwrap(), 'c');
    }

    #[test]
    fn exact_key_is_returned_under_every_policy() {
        let mut m = matcher("abc", &[('a', 0), ('b', 5), ('c', 10)]);
        for policy in [RoundingPolicy::Abs, RoundingPolicy::Up, RoundingPolicy::Down] {
            m.set_rounding_policy(policy);
            assert_eq!(m.lookup_nearest(0.5).unwrap(), 'b');
        }
    }

    #[test]
    fn single_bucket_answers_every_query() {
        let mut m = matcher("q", &[('q', 3)]);
        m.set_rounding_policy(RoundingPolicy::Up);
        assert_eq!(m.lookup_nearest(0.0).unwrap(), 'q');
        assert_eq!(m.lookup_nearest(1.0).unwrap(), 'q');
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("abs".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::Abs);
        assert_eq!("UP".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::Up);
        assert_eq!("Down".parse::<RoundingPolicy>().unwrap(), RoundingPolicy::Down);
        assert!(matches!(
            "nearest".parse::<RoundingPolicy>(),
            Err(AsciiError::UnknownRoundingPolicy(name)) if name == "nearest"
        ));
        assert_eq!(RoundingPolicy::Down.to_string(), "down");
    }

    #[test]
    fn removing_extreme_recomputes_it() {
        let mut m = matcher("abc", &[('a', 1), ('b', 5), ('c', 9)]);

        assert!(m.remove_character('c').unwrap());
        assert_eq!(m.max_density(), Some(0.5));
        assert_eq!(m.min_density(), Some(0.1));

        assert!(m.remove_character('a').unwrap());
        assert_eq!(m.min_density(), Some(0.5));
        assert_eq!(m.max_density(), Some(0.5));
    }

    #[test]
    fn emptied_matcher_is_rebuilt_by_next_add() {
        let mut m = matcher("abc", &[('a', 1), ('b', 5), ('c', 9)]);
        for c in ['a', 'b', 'c'] {
            m.remove_character(c).unwrap();
        }
        assert!(m.is_empty());
        assert_eq!(m.min_density(), None);
        assert_eq!(m.max_density(), None);
        assert!(matches!(m.lookup_nearest(0.5), Err(AsciiError::EmptyMatcher)));

        m.add_character('b').unwrap();
        assert_eq!(m.min_density(), Some(0.5));
        assert_eq!(m.max_density(), Some(0.5));
        assert_eq!(m.lookup_nearest(0.9).unwrap(), 'b');
    }

    #[test]
    fn shared_extreme_survives_partial_bucket_removal() {
        let mut m = matcher("abc", &[('a', 1), ('b', 1), ('c', 9)]);
        m.remove_character('a').unwrap();
        assert_eq!(m.min_density(), Some(0.1));
        assert_eq!(m.lookup_nearest(0.0).unwrap(), 'b');
    }

    #[test]
    fn remove_of_unknown_character_is_a_no_op() {
        let mut m = matcher("ab", &[('a', 1), ('b', 9)]);
        assert!(!m.remove_character('z').unwrap());
        assert_eq!(m.len(), 2);
        assert!(matches!(m.remove_character('\u{7f}'), Err(AsciiError::CharacterOutOfRange(127))));
        assert!(matches!(m.add_character('é'), Err(AsciiError::CharacterOutOfRange(233))));
    }

    #[test]
    fn repeated_add_does_not_duplicate() {
        let mut m = matcher("ab", &[('a', 1), ('b', 9)]);
        assert!(!m.add_character('a').unwrap());
        assert_eq!(m.len(), 2);

        // One removal is enough to drop it completely.
        assert!(m.remove_character('a').unwrap());
        assert!(!m.contains('a'));
        assert_eq!(m.min_density(), Some(0.9));
    }

    #[test]
    fn densities_are_measured_once_per_code() {
        let font = TenthsFont::new(&[('a', 1), ('b', 9)]);
        let calls = Arc::clone(&font.calls);
        let mut m = BrightnessMatcher::with_rasterizer("ab".chars(), font).unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);

        m.remove_character('a').unwrap();
        m.add_character('a').unwrap();
        m.remove_character('a').unwrap();
        m.add_character('a').unwrap();

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(m.rasterizations(), 2);
        assert_eq!(m.density_of('a'), Some(0.1));
        assert_eq!(m.density_of('c'), None);
    }

    #[test]
    fn entries_are_sorted_by_density() {
        let m = matcher("dcba", &[('a', 7), ('b', 2), ('c', 7), ('d', 0)]);
        let entries: Vec<_> = m.entries().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], BrightnessEntry { density: 0.0, characters: vec!['d'] });
        assert_eq!(entries[2].characters, vec!['a', 'c']);
    }

    #[test]
    fn builtin_font_maps_extremes() {
        let m = BrightnessMatcher::new([' ', '@']).unwrap();
        assert_eq!(m.min_density(), Some(0.0));
        assert_eq!(m.lookup_nearest(0.0).unwrap(), ' ');
        assert_eq!(m.lookup_nearest(1.0).unwrap(), '@');
    }

    #[test]
    fn matcher_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<BrightnessMatcher>();
    }
}

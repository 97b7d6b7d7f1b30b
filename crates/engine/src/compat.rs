//! Pairwise track compatibility scoring.
//!
//! Produces an additive score in [0, 100] from declared metadata only.
//! Each feature contributes its points when both tracks expose the field;
//! missing data contributes zero and is never an error. The function is
//! pure and cheap enough to rank every candidate in a library on each
//! smart-fill pass.

use segue_core::Track;

const KEY_EXACT: i32 = 25;
const KEY_RELATED: i32 = 15;
const CAMELOT_EXACT: i32 = 25;
const CAMELOT_ADJACENT: i32 = 15;
const SUB_GENRE_MATCH: i32 = 20;
const GENRE_MATCH: i32 = 10;
const MOOD_TAG_SHARED: i32 = 8;
const TRACK_TYPE_MATCH: i32 = 10;
const ATMOSPHERE_MATCH: i32 = 12;
const DANCEABILITY_CLOSE: i32 = 10;

/// Score how well two tracks mix, 0 (clash) to 100 (seamless).
pub fn compatibility_score(a: &Track, b: &Track) -> u8 {
    let mut total = 0i32;
    total += key_points(a, b);
    total += camelot_points(a, b);
    total += bpm_points(a, b);
    total += genre_points(a, b);
    total += energy_points(a, b);
    total += mood_points(a, b);
    total += track_type_points(a, b);
    total += atmosphere_points(a, b);
    total += danceability_points(a, b);
    total.clamp(0, 100) as u8
}

fn key_points(a: &Track, b: &Track) -> i32 {
    let (Some(key_a), Some(key_b)) = (a.key.as_deref(), b.key.as_deref()) else {
        return 0;
    };
    if key_a.eq_ignore_ascii_case(key_b) {
        return KEY_EXACT;
    }
    // Same root note in different spellings ("A Minor" vs "Am", "F# Minor"
    // vs "F#") still mixes well.
    let root_a = key_root(key_a);
    let root_b = key_root(key_b);
    if contains_ignore_ascii_case(key_a, root_b) || contains_ignore_ascii_case(key_b, root_a) {
        KEY_RELATED
    } else {
        0
    }
}

/// First whitespace-separated token of a key string.
fn key_root(key: &str) -> &str {
    key.split_whitespace().next().unwrap_or(key)
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

fn camelot_points(a: &Track, b: &Track) -> i32 {
    let (Some(code_a), Some(code_b)) = (a.camelot.as_deref(), b.camelot.as_deref()) else {
        return 0;
    };
    if code_a.eq_ignore_ascii_case(code_b) {
        return CAMELOT_EXACT;
    }
    match (camelot_number(code_a), camelot_number(code_b)) {
        (Some(num_a), Some(num_b)) if (num_a - num_b).abs() <= 1 => CAMELOT_ADJACENT,
        _ => 0,
    }
}

/// Leading wheel position of a Camelot code ("8A" -> 8).
fn camelot_number(code: &str) -> Option<i32> {
    let digits: String = code
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn bpm_points(a: &Track, b: &Track) -> i32 {
    let (Some(bpm_a), Some(bpm_b)) = (a.bpm, b.bpm) else {
        return 0;
    };
    let diff = (bpm_a - bpm_b).abs();
    if diff <= 5.0 {
        20
    } else if diff <= 10.0 {
        10
    } else if diff <= 15.0 {
        5
    } else {
        0
    }
}

fn genre_points(a: &Track, b: &Track) -> i32 {
    let mut points = 0;
    if let (Some(sub_a), Some(sub_b)) = (a.sub_genre.as_deref(), b.sub_genre.as_deref()) {
        if sub_a.eq_ignore_ascii_case(sub_b) {
            points += SUB_GENRE_MATCH;
        }
    }
    if let (Some(genre_a), Some(genre_b)) = (a.genre.as_deref(), b.genre.as_deref()) {
        if genre_a.eq_ignore_ascii_case(genre_b) {
            points += GENRE_MATCH;
        }
    }
    points
}

fn energy_points(a: &Track, b: &Track) -> i32 {
    let (Some(energy_a), Some(energy_b)) = (a.energy, b.energy) else {
        return 0;
    };
    let diff = (energy_a as i32 - energy_b as i32).abs();
    if diff <= 2 {
        15
    } else if diff <= 4 {
        8
    } else {
        0
    }
}

fn mood_points(a: &Track, b: &Track) -> i32 {
    let shared = a.mood_tags.intersection(&b.mood_tags).count() as i32;
    shared * MOOD_TAG_SHARED
}

fn track_type_points(a: &Track, b: &Track) -> i32 {
    match (a.track_type, b.track_type) {
        (Some(type_a), Some(type_b)) if type_a == type_b => TRACK_TYPE_MATCH,
        _ => 0,
    }
}

fn atmosphere_points(a: &Track, b: &Track) -> i32 {
    match (a.atmosphere.as_deref(), b.atmosphere.as_deref()) {
        (Some(atmo_a), Some(atmo_b)) if atmo_a.eq_ignore_ascii_case(atmo_b) => ATMOSPHERE_MATCH,
        _ => 0,
    }
}

fn danceability_points(a: &Track, b: &Track) -> i32 {
    let (Some(dance_a), Some(dance_b)) = (a.danceability, b.danceability) else {
        return 0;
    };
    if (dance_a as i32 - dance_b as i32).abs() <= 2 {
        DANCEABILITY_CLOSE
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use segue_core::{TrackId, TrackType};

    use super::*;

    fn track(id: i64) -> Track {
        Track::new(TrackId(id), format!("Track {}", id))
    }

    #[test]
    fn score_is_bounded() {
        // Fully matching tracks with lots of shared moods would exceed 100
        // raw; the result must stay clamped.
        let mut a = track(1);
        a.bpm = Some(128.0);
        a.key = Some("A Minor".to_string());
        a.camelot = Some("8A".to_string());
        a.genre = Some("house".to_string());
        a.sub_genre = Some("deep house".to_string());
        a.energy = Some(6);
        a.danceability = Some(8);
        a.track_type = Some(TrackType::Instrumental);
        a.atmosphere = Some("dark".to_string());
        for tag in ["hypnotic", "warm", "groovy", "late-night"] {
            a.mood_tags.insert(tag.to_string());
        }
        let b = a.clone();

        assert_eq!(compatibility_score(&a, &b), 100);
        assert_eq!(compatibility_score(&a, &a), 100);
    }

    #[test]
    fn empty_tracks_score_zero() {
        let a = track(1);
        let b = track(2);
        assert_eq!(compatibility_score(&a, &b), 0);
    }

    #[test]
    fn deep_house_pair_scores_eighty() {
        // camelot exact (25) + bpm within 5 (20) + sub-genre (20) + energy
        // within 2 (15) = 80.
        let mut a = track(1);
        a.bpm = Some(128.0);
        a.camelot = Some("8A".to_string());
        a.sub_genre = Some("deep house".to_string());
        a.energy = Some(6);

        let mut b = track(2);
        b.bpm = Some(130.0);
        b.camelot = Some("8A".to_string());
        b.sub_genre = Some("deep house".to_string());
        b.energy = Some(6);

        assert_eq!(compatibility_score(&a, &b), 80);
    }

    #[test]
    fn key_root_containment_scores_related() {
        let mut a = track(1);
        a.key = Some("A Minor".to_string());
        let mut b = track(2);
        b.key = Some("Am".to_string());
        // "Am" contains root "A".
        assert_eq!(compatibility_score(&a, &b), 15);

        b.key = Some("A Minor".to_string());
        assert_eq!(compatibility_score(&a, &b), 25);
    }

    #[test]
    fn camelot_adjacency_scores_fifteen() {
        let mut a = track(1);
        a.camelot = Some("8A".to_string());
        let mut b = track(2);
        b.camelot = Some("9B".to_string());
        assert_eq!(compatibility_score(&a, &b), 15);

        b.camelot = Some("10A".to_string());
        assert_eq!(compatibility_score(&a, &b), 0);

        b.camelot = Some("8a".to_string());
        assert_eq!(compatibility_score(&a, &b), 25);
    }

    #[test]
    fn bpm_bands() {
        let mut a = track(1);
        let mut b = track(2);
        a.bpm = Some(128.0);

        b.bpm = Some(133.0);
        assert_eq!(compatibility_score(&a, &b), 20);
        b.bpm = Some(138.0);
        assert_eq!(compatibility_score(&a, &b), 10);
        b.bpm = Some(143.0);
        assert_eq!(compatibility_score(&a, &b), 5);
        b.bpm = Some(144.0);
        assert_eq!(compatibility_score(&a, &b), 0);
    }

    #[test]
    fn mood_overlap_is_per_tag() {
        let mut a = track(1);
        let mut b = track(2);
        for tag in ["dark", "driving", "euphoric"] {
            a.mood_tags.insert(tag.to_string());
        }
        for tag in ["dark", "driving", "melancholic"] {
            b.mood_tags.insert(tag.to_string());
        }
        assert_eq!(compatibility_score(&a, &b), 16);
    }

    #[test]
    fn genre_and_sub_genre_are_independent() {
        let mut a = track(1);
        let mut b = track(2);
        a.genre = Some("Techno".to_string());
        b.genre = Some("techno".to_string());
        assert_eq!(compatibility_score(&a, &b), 10);

        a.sub_genre = Some("melodic techno".to_string());
        b.sub_genre = Some("Melodic Techno".to_string());
        assert_eq!(compatibility_score(&a, &b), 30);
    }

    #[test]
    fn missing_fields_contribute_nothing() {
        let mut a = track(1);
        a.bpm = Some(128.0);
        a.energy = Some(9);
        let b = track(2); // No fields at all.
        assert_eq!(compatibility_score(&a, &b), 0);
    }
}

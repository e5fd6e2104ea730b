/*
 * @file reactions.rs
 * @brief Gesture and reply to emotion reaction table
 * @author Kevin Thomas
 * @date 2025
 *
 * MIT License
 *
 * Copyright (c) 2025 Kevin Thomas
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Reaction table mapping gestures and reply text to face emotions.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::detector::GestureKind;
use crate::face::Emotion;

/// Default location of the reactions file.
pub const REACTIONS_FILE: &str = "reactions.json";

/// One keyword group that selects an emotion.
///
/// # Details
/// Matches when any keyword appears as a substring of the lowercased text.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KeywordReaction {
    /// Phrases that trigger this emotion.
    pub keywords: Vec<String>,
    /// Emotion shown when a keyword matches.
    pub emotion: Emotion,
    /// Human-readable description of the reaction.
    #[serde(default)]
    pub description: String,
}

/// All configured reactions.
///
/// # Details
/// Loaded from `reactions.json`. Missing fields fall back to the built-in
/// table: waves make the face happy, gun poses make it angry, and reply
/// keywords are checked in file order with the first match winning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ReactionsConfig {
    #[serde(default = "default_wave_emotion")]
    pub wave: Emotion,
    #[serde(default = "default_gun_emotion")]
    pub gun: Emotion,
    #[serde(default = "default_keyword_reactions")]
    pub responses: Vec<KeywordReaction>,
    /// Emotion for replies that match no keyword group.
    #[serde(default)]
    pub fallback: Emotion,
}

impl Default for ReactionsConfig {
    fn default() -> Self {
        Self {
            wave: default_wave_emotion(),
            gun: default_gun_emotion(),
            responses: default_keyword_reactions(),
            fallback: Emotion::default(),
        }
    }
}

/// Loads the reaction table, falling back to defaults when the file is
/// missing or invalid.
///
/// # Arguments
/// * `path` - Location of the reactions file.
///
/// # Returns
/// * `ReactionsConfig` - Loaded or default reaction table.
pub fn load_reactions(path: &Path) -> ReactionsConfig {
    load_reactions_from_file(path).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %format!("{err:#}"), "using default reactions");
        ReactionsConfig::default()
    })
}

/// Reads and parses the reactions file.
///
/// # Details
/// Missing fields inside the file take their built-in defaults.
///
/// # Arguments
/// * `path` - Location of the reactions file.
///
/// # Returns
/// * `Ok(ReactionsConfig)` - The parsed table.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid JSON.
fn load_reactions_from_file(path: &Path) -> Result<ReactionsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Emotion shown for a wave when the table names none.
///
/// # Details
/// Serde default for `wave`.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `Emotion` - [`Emotion::Happy`].
fn default_wave_emotion() -> Emotion {
    Emotion::Happy
}

/// Emotion shown for a gun pose when the table names none.
///
/// # Details
/// Serde default for `gun`.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `Emotion` - [`Emotion::Angry`].
fn default_gun_emotion() -> Emotion {
    Emotion::Angry
}

/// Keyword groups for Malayalam roast replies, harshest first.
///
/// # Details
/// Order matters: a reply that mixes harsh and friendly words matches the
/// harsh group first.
///
/// # Arguments
/// None.
///
/// # Returns
/// * `Vec<KeywordReaction>` - Angry, Dizzy, Suspect and Happy groups.
fn default_keyword_reactions() -> Vec<KeywordReaction> {
    let group = |keywords: &[&str], emotion, description: &str| KeywordReaction {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        emotion,
        description: description.to_string(),
    };
    vec![
        group(
            &["കഴിവ് ഇല്ല", "മോശം", "പ്രശ്നം", "കുഴപ്പം"],
            Emotion::Angry,
            "Harsh roast",
        ),
        group(
            &["എന്തോ", "അറിയില്ല", "കൺഫ്യൂഷൻ"],
            Emotion::Dizzy,
            "Confused reply",
        ),
        group(
            &["സംശയം", "എന്താ", "വിചിത്രം"],
            Emotion::Suspect,
            "Suspicious or questioning reply",
        ),
        group(
            &["പൊളിച്ചു", "നല്ലത്", "കൊള്ളാം"],
            Emotion::Happy,
            "Light-hearted reply",
        ),
    ]
}

/// Finds the first keyword group that matches `text`.
///
/// # Arguments
/// * `reactions` - The reaction table to search.
/// * `text` - Reply text in any case.
///
/// # Returns
/// * `Some(&KeywordReaction)` - The first matching group.
/// * `None` - No group matched.
pub fn find_reaction<'a>(reactions: &'a ReactionsConfig, text: &str) -> Option<&'a KeywordReaction> {
    let normalized = text.to_lowercase();
    reactions.responses.iter().find(|reaction| {
        reaction
            .keywords
            .iter()
            .any(|keyword| normalized.contains(&keyword.to_lowercase()))
    })
}

/// Emotion the face should show after speaking `text`.
pub fn emotion_for_response(reactions: &ReactionsConfig, text: &str) -> Emotion {
    find_reaction(reactions, text)
        .map(|reaction| reaction.emotion)
        .unwrap_or(reactions.fallback)
}

/// Emotion the face should show for a confirmed gesture.
pub fn emotion_for_gesture(reactions: &ReactionsConfig, kind: GestureKind) -> Emotion {
    match kind {
        GestureKind::Wave => reactions.wave,
        GestureKind::Gun => reactions.gun,
    }
}

/// One-line-per-entry summary of the table, logged at session start.
pub fn describe_reactions(reactions: &ReactionsConfig) -> String {
    let mut result = String::from("Configured reactions:\n");
    result.push_str(&format!("- wave: {}\n", reactions.wave));
    result.push_str(&format!("- gun: {}\n", reactions.gun));
    for reaction in &reactions.responses {
        result.push_str(&format!("- {}: {}\n", reaction.emotion, reaction.description));
    }
    result.push_str(&format!("- otherwise: {}\n", reactions.fallback));
    result
}

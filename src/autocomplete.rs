/// Candidates containing `input` (case-insensitive), in source order, minus
/// any candidate that already equals the input.
pub fn filter(input: &str, candidates: &[String]) -> Vec<String> {
    let needle = input.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| {
            let hay = candidate.to_lowercase();
            hay.contains(&needle) && hay != needle
        })
        .cloned()
        .collect()
}

/// Text field with a suggestion dropdown.
///
/// Losing focus is two-phase: `blur` only marks the hide as pending and
/// `commit_blur` applies it, so a selection made in between still lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutocompleteInput {
    value: String,
    suggestions: Vec<String>,
    focused: bool,
    open: bool,
    blur_pending: bool,
    highlighted: usize,
}

impl AutocompleteInput {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    /// Keystroke path: recompute suggestions for the new text and open the list.
    pub fn on_change(&mut self, text: impl Into<String>, candidates: &[String]) {
        self.value = text.into();
        self.suggestions = filter(&self.value, candidates);
        self.highlighted = 0;
        self.open = true;
    }

    pub fn push_char(&mut self, ch: char, candidates: &[String]) {
        let mut text = std::mem::take(&mut self.value);
        text.push(ch);
        self.on_change(text, candidates);
    }

    pub fn pop_char(&mut self, candidates: &[String]) {
        let mut text = std::mem::take(&mut self.value);
        text.pop();
        self.on_change(text, candidates);
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.blur_pending = false;
    }

    pub fn blur(&mut self) {
        if self.focused {
            self.blur_pending = true;
        }
    }

    /// Returns true when a pending blur was applied.
    pub fn commit_blur(&mut self) -> bool {
        if !self.blur_pending {
            return false;
        }
        self.blur_pending = false;
        self.focused = false;
        self.open = false;
        true
    }

    /// Suggestions to render right now; empty unless focused with non-empty text.
    pub fn visible_suggestions(&self) -> &[String] {
        if self.focused && self.open && !self.value.is_empty() {
            &self.suggestions
        } else {
            &[]
        }
    }

    pub fn is_showing(&self) -> bool {
        !self.visible_suggestions().is_empty()
    }

    pub fn highlight_next(&mut self) {
        let len = self.visible_suggestions().len();
        if len > 0 {
            self.highlighted = (self.highlighted + 1).min(len - 1);
        }
    }

    pub fn highlight_prev(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    /// Commits `candidate` and closes the list without filtering again.
    pub fn select(&mut self, candidate: &str) {
        self.value = candidate.to_string();
        self.open = false;
        self.highlighted = 0;
    }

    pub fn select_highlighted(&mut self) -> Option<String> {
        let candidate = self.visible_suggestions().get(self.highlighted)?.clone();
        self.select(&candidate);
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_is_case_insensitive_and_stable() {
        let teams = names(&["Chelsea", "Arsenal", "Real Madrid", "Arsenal B"]);
        assert_eq!(filter("AR", &teams), names(&["Arsenal", "Real Madrid", "Arsenal B"]));
    }

    #[test]
    fn exact_match_is_dropped() {
        let teams = names(&["Arsenal", "Arsenal B"]);
        assert_eq!(filter("arsenal", &teams), names(&["Arsenal B"]));
    }

    #[test]
    fn select_does_not_refilter() {
        let teams = names(&["Arsenal", "Arsenal B"]);
        let mut input = AutocompleteInput::default();
        input.focus();
        input.on_change("ars", &teams);
        input.select("Arsenal");
        assert_eq!(input.value(), "Arsenal");
        assert!(!input.is_showing());
        assert_eq!(input.suggestions, names(&["Arsenal", "Arsenal B"]));
    }
}

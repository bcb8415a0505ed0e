use std::sync::mpsc::Sender;

use tracing::warn;

use crate::api::PredictorApi;
use crate::state::{Delta, ProviderCommand, TeamSlot};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SlotLogo {
    generation: u64,
    logo_url: String,
}

/// Last resolved logo per team slot. Each new lookup bumps the slot's
/// generation so an older lookup that settles late cannot overwrite it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamLogoResolver {
    home: SlotLogo,
    away: SlotLogo,
}

impl TeamLogoResolver {
    fn slot(&self, slot: TeamSlot) -> &SlotLogo {
        match slot {
            TeamSlot::Home => &self.home,
            TeamSlot::Away => &self.away,
        }
    }

    fn slot_mut(&mut self, slot: TeamSlot) -> &mut SlotLogo {
        match slot {
            TeamSlot::Home => &mut self.home,
            TeamSlot::Away => &mut self.away,
        }
    }

    /// Empty string means "no logo".
    pub fn logo(&self, slot: TeamSlot) -> &str {
        &self.slot(slot).logo_url
    }

    /// Drops the shown logo without touching the generation, for a lookup
    /// that could not be dispatched.
    pub fn clear(&mut self, slot: TeamSlot) {
        self.slot_mut(slot).logo_url.clear();
    }

    /// Registers a value change for `slot`. A blank team clears the logo
    /// immediately and needs no lookup.
    pub fn request(&mut self, slot: TeamSlot, team: &str) -> Option<ProviderCommand> {
        let entry = self.slot_mut(slot);
        entry.generation += 1;
        if team.trim().is_empty() {
            entry.logo_url.clear();
            return None;
        }
        Some(ProviderCommand::ResolveLogo {
            slot,
            generation: entry.generation,
            team: team.to_string(),
        })
    }

    /// Returns false when `generation` is no longer current for the slot.
    pub fn settle(&mut self, slot: TeamSlot, generation: u64, logo_url: Option<String>) -> bool {
        let entry = self.slot_mut(slot);
        if entry.generation != generation {
            return false;
        }
        entry.logo_url = logo_url.unwrap_or_default();
        true
    }
}

pub fn resolve_logo_job(
    api: &dyn PredictorApi,
    slot: TeamSlot,
    generation: u64,
    team: &str,
    tx: &Sender<Delta>,
) {
    let logo_url = match api.team_logo(team) {
        Ok(url) => url.filter(|u| !u.trim().is_empty()),
        Err(err) => {
            warn!(team, error = %err, "logo lookup failed");
            let _ = tx.send(Delta::Log(format!("[WARN] Logo error for {team}: {err:#}")));
            None
        }
    };
    let _ = tx.send(Delta::LogoSettled {
        slot,
        generation,
        logo_url,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_lookup_for_old_name_is_ignored() {
        let mut logos = TeamLogoResolver::default();
        let first = logos.request(TeamSlot::Home, "Arsenal");
        let second = logos.request(TeamSlot::Home, "Chelsea");
        let (
            Some(ProviderCommand::ResolveLogo { generation: g1, .. }),
            Some(ProviderCommand::ResolveLogo { generation: g2, .. }),
        ) = (first, second)
        else {
            panic!("expected two lookups");
        };
        assert!(logos.settle(TeamSlot::Home, g2, Some("chelsea.png".to_string())));
        assert!(!logos.settle(TeamSlot::Home, g1, Some("arsenal.png".to_string())));
        assert_eq!(logos.logo(TeamSlot::Home), "chelsea.png");
        assert_eq!(logos.logo(TeamSlot::Away), "");
    }

    #[test]
    fn blank_team_clears_without_lookup() {
        let mut logos = TeamLogoResolver::default();
        if let Some(ProviderCommand::ResolveLogo { generation, .. }) =
            logos.request(TeamSlot::Away, "Chelsea")
        {
            logos.settle(TeamSlot::Away, generation, Some("chelsea.png".to_string()));
        }
        assert!(logos.request(TeamSlot::Away, "").is_none());
        assert_eq!(logos.logo(TeamSlot::Away), "");
    }

    #[test]
    fn cleared_slot_still_accepts_the_current_lookup() {
        let mut logos = TeamLogoResolver::default();
        let Some(ProviderCommand::ResolveLogo { generation, .. }) =
            logos.request(TeamSlot::Home, "Arsenal")
        else {
            panic!("expected a lookup");
        };
        logos.settle(TeamSlot::Home, generation, Some("arsenal.png".to_string()));
        logos.clear(TeamSlot::Home);
        assert_eq!(logos.logo(TeamSlot::Home), "");
        assert!(logos.settle(TeamSlot::Home, generation, Some("again.png".to_string())));
    }
}

//! Minimal automatic player that acts on nothing but its own snapshot. Used
//! by the table simulator and end-to-end tests.

use super::intents::{ClaimType, Intent};
use super::snapshot::TableSnapshot;
use crate::engine::tw::ClaimKind;

/// Pick the next intent for the snapshot's viewer, or `None` if it has
/// nothing to decide right now.
pub fn suggest(snapshot: &TableSnapshot) -> Option<Intent> {
    let me = snapshot.me.as_ref()?;
    let legal = &me.legal;
    if legal.ting.is_some() {
        return Some(Intent::Ting { declare: true });
    }
    if let Some(option) = &legal.claim {
        let window = snapshot.claim.as_ref().map(|c| c.window);
        let best = option.kinds.first().copied();
        let (claim, tiles) = match best {
            Some(ClaimKind::Hu) => (ClaimType::Hu, Vec::new()),
            Some(ClaimKind::Kong) => (ClaimType::Kong, Vec::new()),
            Some(ClaimKind::Pong) => (ClaimType::Pong, Vec::new()),
            Some(ClaimKind::Chi) => match option.chi_runs.first() {
                Some(run) => (ClaimType::Chi, run.to_vec()),
                None => (ClaimType::Pass, Vec::new()),
            },
            None => (ClaimType::Pass, Vec::new()),
        };
        return Some(Intent::Claim {
            claim,
            tiles,
            window,
        });
    }
    if legal.may_self_hu {
        return Some(Intent::Claim {
            claim: ClaimType::Hu,
            tiles: Vec::new(),
            window: None,
        });
    }
    if legal.may_draw {
        return Some(Intent::Draw);
    }
    if let Some(kong) = legal.self_kongs.first() {
        return Some(Intent::SelfKong { tile: kong.tile });
    }
    if legal.may_discard {
        let tile = me.last_drawn.or_else(|| me.my_hand.first().copied())?;
        return Some(Intent::Discard { tile });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomSettings;
    use crate::engine::tw::NUM_SEATS;
    use crate::game::MatchController;
    use crate::protocol::snapshot::{build_snapshot, SeatInfo};
    use uuid::Uuid;

    #[test]
    fn dealer_draws_first_and_others_wait() {
        let mut ctl = MatchController::new(RoomSettings::default(), false, Some(11));
        ctl.start_round(RoomSettings::default());
        let seats: [Option<SeatInfo>; NUM_SEATS] = [None; NUM_SEATS];
        let dealer = build_snapshot(Uuid::nil(), &seats, &ctl, Some(ctl.dealer()));
        assert_eq!(suggest(&dealer), Some(Intent::Draw));
        let other = build_snapshot(Uuid::nil(), &seats, &ctl, Some(1));
        assert_eq!(suggest(&other), None);
        let spectator = build_snapshot(Uuid::nil(), &seats, &ctl, None);
        assert_eq!(suggest(&spectator), None);
    }
}

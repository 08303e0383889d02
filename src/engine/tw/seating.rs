use super::state::HandState;
use super::tiles::Wind;
use super::types::*;

/// Seat after `seat` in turn order.
pub fn next_seat(seat: SeatId) -> SeatId {
    (seat + 1) % NUM_SEATS as u8
}

/// Steps in turn order from `from` to `to`; 0 when they are the same seat.
pub fn distance(from: SeatId, to: SeatId) -> u8 {
    (to + NUM_SEATS as u8 - from) % NUM_SEATS as u8
}

/// The dealer always sits East.
pub fn seat_wind(dealer: SeatId, seat: SeatId) -> Wind {
    Wind::from_index(distance(dealer, seat) as usize)
}

pub trait Seating {
    fn next_to_act(&self, from: SeatId) -> SeatId;
    fn seat_wind(&self, seat: SeatId) -> Wind;
    fn is_dealer(&self, seat: SeatId) -> bool;
}

impl Seating for HandState {
    fn next_to_act(&self, from: SeatId) -> SeatId {
        next_seat(from)
    }

    fn seat_wind(&self, seat: SeatId) -> Wind {
        seat_wind(self.dealer, seat)
    }

    fn is_dealer(&self, seat: SeatId) -> bool {
        self.dealer == seat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_wrap_around_the_table() {
        assert_eq!(next_seat(3), 0);
        assert_eq!(distance(3, 1), 2);
        assert_eq!(distance(2, 2), 0);
        assert_eq!(seat_wind(2, 2), Wind::East);
        assert_eq!(seat_wind(2, 1), Wind::North);
    }
}

//! Named rooms and which connections are currently in them.
//!
//! A room exists only while it has members: it is created by the first join
//! and dropped when the last member leaves.

use std::collections::{BTreeSet, HashMap};

use crate::registry::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// Members after the join, joiner included.
    pub members: Vec<ConnectionId>,
    /// `false` when the connection was already in the room.
    pub newly_joined: bool,
}

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, BTreeSet<ConnectionId>>,
}

impl RoomDirectory {
    pub fn join(&mut self, room: &str, connection: ConnectionId) -> Joined {
        let members = self.rooms.entry(room.to_owned()).or_default();
        let newly_joined = members.insert(connection);
        Joined {
            members: members.iter().copied().collect(),
            newly_joined,
        }
    }

    /// Returns the remaining members, or `None` if `connection` was not in
    /// `room` (including when the room does not exist).
    pub fn leave(&mut self, room: &str, connection: ConnectionId) -> Option<Vec<ConnectionId>> {
        let members = self.rooms.get_mut(room)?;
        if !members.remove(&connection) {
            return None;
        }
        let remaining: Vec<_> = members.iter().copied().collect();
        if remaining.is_empty() {
            self.rooms.remove(room);
        }
        Some(remaining)
    }

    /// Takes `connection` out of every room it is in, returning those room
    /// names. Emits nothing.
    pub fn remove_connection_from_all(&mut self, connection: ConnectionId) -> Vec<String> {
        let mut left = Vec::new();
        self.rooms.retain(|name, members| {
            if members.remove(&connection) {
                left.push(name.clone());
            }
            !members.is_empty()
        });
        left.sort();
        left
    }

    pub fn members_of(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, room: &str, connection: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .map_or(false, |members| members.contains(&connection))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_creates_room_and_includes_joiner() {
        let mut rooms = RoomDirectory::default();
        let (a, b) = (ConnectionId::next(), ConnectionId::next());

        let first = rooms.join("lobby", a);
        assert_eq!(first.members, vec![a]);
        assert!(first.newly_joined);

        let second = rooms.join("lobby", b);
        assert_eq!(second.members, vec![a, b]);
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn rejoin_keeps_single_membership() {
        let mut rooms = RoomDirectory::default();
        let a = ConnectionId::next();

        rooms.join("lobby", a);
        let again = rooms.join("lobby", a);

        assert!(!again.newly_joined);
        assert_eq!(again.members, vec![a]);
    }

    #[test]
    fn leave_excludes_leaver_and_drops_empty_room() {
        let mut rooms = RoomDirectory::default();
        let (a, b) = (ConnectionId::next(), ConnectionId::next());
        rooms.join("lobby", a);
        rooms.join("lobby", b);

        assert_eq!(rooms.leave("lobby", a), Some(vec![b]));
        assert!(!rooms.is_member("lobby", a));

        assert_eq!(rooms.leave("lobby", b), Some(vec![]));
        assert!(rooms.is_empty());
    }

    #[test]
    fn leave_when_not_a_member_is_a_no_op() {
        let mut rooms = RoomDirectory::default();
        let (a, b) = (ConnectionId::next(), ConnectionId::next());
        rooms.join("lobby", a);

        assert_eq!(rooms.leave("lobby", b), None);
        assert_eq!(rooms.leave("nowhere", a), None);
        assert_eq!(rooms.members_of("lobby"), vec![a]);
    }

    #[test]
    fn remove_from_all_clears_every_membership() {
        let mut rooms = RoomDirectory::default();
        let (a, b) = (ConnectionId::next(), ConnectionId::next());
        rooms.join("lobby", a);
        rooms.join("games", a);
        rooms.join("games", b);

        assert_eq!(rooms.remove_connection_from_all(a), vec!["games", "lobby"]);
        assert!(rooms.members_of("lobby").is_empty());
        assert_eq!(rooms.members_of("games"), vec![b]);
        assert_eq!(rooms.len(), 1);
        assert!(rooms.remove_connection_from_all(a).is_empty());
    }
}

pub mod client;
pub mod messages;

pub use client::{NatsRoomConnection, NatsRoomTransport};
pub use messages::{
    decode_room_message, DataMessage, JoinAnnouncement, LeaveAnnouncement, ParticipantMessage, RoomClosedMessage,
    TextStreamMessage,
};

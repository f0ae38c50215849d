// service/realtime.rs
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::messagemodel::Message;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of newly stored chat messages to open SSE streams. Every stream
/// receives every message and keeps only those for its task and viewer.
#[derive(Debug, Clone)]
pub struct ChatHub {
    sender: broadcast::Sender<Message>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many subscribers saw the message; zero is not an error.
    pub fn publish(&self, message: Message) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub fn is_visible_to(message: &Message, task_id: Uuid, viewer_id: Uuid) -> bool {
    message.task_id == task_id && message.involves(viewer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(task_id: Uuid, sender_id: Uuid, receiver_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            task_id,
            sender_id,
            receiver_id,
            content: "Is the job still open?".to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_messages() {
        let hub = ChatHub::new();
        let mut rx = hub.subscribe();
        let msg = message(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(hub.publish(msg.clone()), 1);
        assert_eq!(rx.recv().await.expect("message"), msg);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = ChatHub::new();
        assert_eq!(hub.publish(message(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())), 0);
    }

    #[test]
    fn dropped_stream_unsubscribes() {
        let hub = ChatHub::new();
        let rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn messages_only_visible_to_participants_of_the_task() {
        let task = Uuid::new_v4();
        let poster = Uuid::new_v4();
        let worker = Uuid::new_v4();
        let msg = message(task, worker, poster);

        assert!(is_visible_to(&msg, task, poster));
        assert!(is_visible_to(&msg, task, worker));
        assert!(!is_visible_to(&msg, task, Uuid::new_v4()));
        assert!(!is_visible_to(&msg, Uuid::new_v4(), poster));
    }
}

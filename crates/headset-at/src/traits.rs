//! Outbound side of the AT link, abstracted for testing.

use async_trait::async_trait;
use headset_core::{LinkError, OutgoingCommand};

/// Writes AT commands to the phone.
///
/// Commands are written in call order. A failed send is terminal for the
/// link that produced it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AtSender: Send {
    /// Serialize and write one command.
    async fn send(&mut self, command: &OutgoingCommand) -> Result<(), LinkError>;

    /// Flush and shut down the write half.
    async fn close(&mut self) -> Result<(), LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;

    mod mock_sender {
        use super::*;

        #[tokio::test]
        async fn commands_are_sent_in_call_order() {
            let mut mock = MockAtSender::new();
            let mut seq = Sequence::new();
            mock.expect_send()
                .with(eq(OutgoingCommand::Answer))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            mock.expect_send()
                .with(eq(OutgoingCommand::SpeakerGain(7)))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));

            let mut sender: Box<dyn AtSender> = Box::new(mock);
            sender.send(&OutgoingCommand::Answer).await.unwrap();
            sender.send(&OutgoingCommand::SpeakerGain(7)).await.unwrap();
        }

        #[tokio::test]
        async fn mock_send_failure_is_reported() {
            let mut mock = MockAtSender::new();
            mock.expect_send().returning(|_| Err(LinkError::Closed));
            mock.expect_close().returning(|| Ok(()));

            let result = mock.send(&OutgoingCommand::HangUp).await;
            assert!(matches!(result, Err(LinkError::Closed)));
            mock.close().await.unwrap();
        }
    }
}

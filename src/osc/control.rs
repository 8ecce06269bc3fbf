use std::mem::MaybeUninit;
use std::sync::Arc;

use ringbuf::{Consumer, HeapRb, Producer, SharedRb};
use thiserror::Error;

use super::ramp::ParameterId;

/// Capacity of the control-thread to audio-thread command queue. Updates
/// arrive at UI rates, so a small bound is plenty.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Alias for the ring buffer producer carrying parameter updates.
pub type CommandProducer =
    Producer<ParameterUpdate, Arc<SharedRb<ParameterUpdate, Vec<MaybeUninit<ParameterUpdate>>>>>;
/// Alias for the ring buffer consumer drained by the audio thread.
pub type CommandConsumer =
    Consumer<ParameterUpdate, Arc<SharedRb<ParameterUpdate, Vec<MaybeUninit<ParameterUpdate>>>>>;

/// A single parameter change travelling from the control thread to the
/// audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterUpdate {
    pub id: ParameterId,
    pub value: f32,
    /// `None` picks the default ramp time of the receiving oscillator.
    pub ramp_seconds: Option<f32>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControlError {
    #[error("Command queue full, update for {} dropped", .0.tag())]
    CommandQueueFull(ParameterId),
}

/// Control-thread side of an oscillator.
///
/// Obtained from [`OscillatorCore::bind_control`](super::OscillatorCore::bind_control).
/// Updates pushed here are drained by the audio thread at the top of its
/// next `next_sample()` call. The hand-off is a single-producer
/// single-consumer ring buffer, so neither side ever waits on the other;
/// a full queue is reported back to the caller and the update is dropped.
///
/// Several updates for the same parameter may be queued at once. The audio
/// thread applies them in order, so the last one wins: each update replaces
/// the ramp started by the previous one, continuing from the interpolated
/// value.
pub struct ControlHandle {
    producer: CommandProducer,
}

impl ControlHandle {
    pub(crate) fn new(producer: CommandProducer) -> Self {
        Self { producer }
    }

    /// Queues an update for any parameter.
    pub fn set(
        &mut self,
        id: ParameterId,
        value: f32,
        ramp_seconds: Option<f32>,
    ) -> Result<(), ControlError> {
        self.producer
            .push(ParameterUpdate {
                id,
                value,
                ramp_seconds,
            })
            .map_err(|update| ControlError::CommandQueueFull(update.id))
    }

    /// Shortcut for the frequency parameter, in Hz.
    pub fn set_frequency(&mut self, hz: f32, ramp_seconds: Option<f32>) -> Result<(), ControlError> {
        self.set(ParameterId::Frequency, hz, ramp_seconds)
    }

    /// Shortcut for the amplitude parameter.
    pub fn set_amplitude(
        &mut self,
        amplitude: f32,
        ramp_seconds: Option<f32>,
    ) -> Result<(), ControlError> {
        self.set(ParameterId::Amplitude, amplitude, ramp_seconds)
    }

    /// Shortcut for the duty cycle, in (0, 1).
    pub fn set_pulse_width(
        &mut self,
        pulse_width: f32,
        ramp_seconds: Option<f32>,
    ) -> Result<(), ControlError> {
        self.set(ParameterId::PulseWidth, pulse_width, ramp_seconds)
    }

    /// Shortcut for the detuning offset, in Hz.
    pub fn set_detuning_offset(
        &mut self,
        offset: f32,
        ramp_seconds: Option<f32>,
    ) -> Result<(), ControlError> {
        self.set(ParameterId::DetuningOffset, offset, ramp_seconds)
    }

    /// Shortcut for the detuning multiplier.
    pub fn set_detuning_multiplier(
        &mut self,
        multiplier: f32,
        ramp_seconds: Option<f32>,
    ) -> Result<(), ControlError> {
        self.set(ParameterId::DetuningMultiplier, multiplier, ramp_seconds)
    }
}

/// Builds the bounded queue backing one control link.
pub(crate) fn command_queue() -> (CommandProducer, CommandConsumer) {
    let rb: HeapRb<ParameterUpdate> = HeapRb::new(COMMAND_QUEUE_CAPACITY);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_updates_arrive_in_order() {
        let (producer, mut consumer) = command_queue();
        let mut handle = ControlHandle::new(producer);

        handle.set_frequency(220.0, None).unwrap();
        handle.set_frequency(330.0, Some(0.1)).unwrap();

        let first = consumer.pop().unwrap();
        let second = consumer.pop().unwrap();

        assert_eq!(first.id, ParameterId::Frequency);
        assert_eq!(first.value, 220.0);
        assert_eq!(first.ramp_seconds, None);
        assert_eq!(second.value, 330.0);
        assert_eq!(second.ramp_seconds, Some(0.1));
        assert!(consumer.pop().is_none());
    }

    #[test]
    fn test_queue_full_reports_parameter() {
        let (producer, _consumer) = command_queue();
        let mut handle = ControlHandle::new(producer);

        let mut last = Ok(());
        for _ in 0..=COMMAND_QUEUE_CAPACITY {
            last = handle.set_amplitude(0.5, None);
        }

        match last {
            Err(ControlError::CommandQueueFull(id)) => {
                assert_eq!(id, ParameterId::Amplitude)
            }
            other => panic!("Expected a full queue, got {:?}", other),
        }
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (producer, mut consumer) = command_queue();
        let mut handle = ControlHandle::new(producer);
        let (done_tx, done_rx) = crossbeam::channel::bounded(1);

        let writer = thread::spawn(move || {
            for step in 0..10 {
                handle
                    .set_frequency(220.0 + step as f32, Some(0.01))
                    .unwrap();
            }
            done_tx.send(()).unwrap();
        });

        done_rx.recv().unwrap();
        let mut received = 0;
        while let Some(update) = consumer.pop() {
            assert_eq!(update.id, ParameterId::Frequency);
            received += 1;
        }

        assert_eq!(received, 10);
        writer.join().unwrap();
    }
}

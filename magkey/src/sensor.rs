/// Source of raw per-key analog samples.
///
/// The sampling hardware runs on its own; `sample` returns the latest completed
/// conversion and must never wait for a new one.
pub trait AnalogSensor {
    /// Service pending conversions. Called once per tick before any key is read.
    fn advance(&mut self);

    /// Latest raw sample of `key`, in the sensor's native range
    fn sample(&mut self, key: usize) -> u16;
}

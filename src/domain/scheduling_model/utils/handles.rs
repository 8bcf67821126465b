use slotmap::new_key_type;

new_key_type! {
    /// Arena handle of a `Resource` inside the `CapacityEngine`.
    pub struct ResourceId;
    /// Arena handle of an `Activity`.
    pub struct ActivityId;
    /// Arena handle of a `Batch`.
    pub struct BatchId;
    /// Arena handle of a `Block`.
    pub struct BlockId;
    /// Arena handle of a continuity `Reservation`.
    pub struct ReservationId;
}

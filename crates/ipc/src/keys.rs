//! Tile key encoding for the `known` map of a join message.

/// Encode tile coordinates as `"tx,ty"`
pub fn encode_tile_key(tx: i32, ty: i32) -> String {
    format!("{tx},{ty}")
}

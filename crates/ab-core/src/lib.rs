pub mod codec;
pub mod id;
pub mod model;
pub mod presets;

pub use codec::{
    CanvasData, CanvasPayload, CodecError, DesignRecord, SceneInstruction, decode_document,
    decode_document_or_blank, deserialize, encode_canvas_data, encode_document,
};
pub use id::ObjectId;
pub use model::*;
pub use presets::ShapePreset;

//! SeaORM entity models
//!
//! Database entities for Labsite

mod research;
mod progress;
mod progress_text;
mod progress_video;
mod progress_image;
mod progress_map;
mod lecturer_material;
mod publication;

pub use research::{
    Entity as ResearchEntity,
    Model as Research,
    ActiveModel as ResearchActiveModel,
    Column as ResearchColumn,
};

pub use progress::{
    Entity as ProgressEntity,
    Model as Progress,
    ActiveModel as ProgressActiveModel,
    Column as ProgressColumn,
};

pub use progress_text::{
    Entity as TextBlockEntity,
    Model as TextBlockRow,
    ActiveModel as TextBlockActiveModel,
    Column as TextBlockColumn,
};

pub use progress_video::{
    Entity as VideoBlockEntity,
    Model as VideoBlockRow,
    ActiveModel as VideoBlockActiveModel,
    Column as VideoBlockColumn,
};

pub use progress_image::{
    Entity as ImageBlockEntity,
    Model as ImageBlockRow,
    ActiveModel as ImageBlockActiveModel,
    Column as ImageBlockColumn,
};

pub use progress_map::{
    Entity as MapBlockEntity,
    Model as MapBlockRow,
    ActiveModel as MapBlockActiveModel,
    Column as MapBlockColumn,
};

pub use lecturer_material::{
    Entity as LecturerMaterialEntity,
    Model as LecturerMaterial,
    ActiveModel as LecturerMaterialActiveModel,
    Column as LecturerMaterialColumn,
};

pub use publication::{
    Entity as PublicationEntity,
    Model as Publication,
    ActiveModel as PublicationActiveModel,
    Column as PublicationColumn,
};

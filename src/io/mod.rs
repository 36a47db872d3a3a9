mod export;
mod manual;
mod tabular;

pub use export::{
    to_dot, to_json, write_dot, write_json, Dot, DotOptions, LinkDocument, NetworkDocument,
    NodeDocument, Summary,
};
pub use manual::{
    load_manual_spec, network_from_texts, parse_adjacency_list, parse_interactions,
    InteractionSpec,
};
pub use tabular::{network_from_dataset, Dataset};

//! Schema registry
//!
//! Static, per-node-type definitions of the expected input slots and the
//! per-provider configuration fields. Pure data: the validator walks these
//! tables, nothing here has side effects.

use serde_json::Value;

use crate::domain::node::NodeType;

/// How many references an input slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    Multiple,
}

/// Declaration of one input slot
#[derive(Debug, Clone, Copy)]
pub struct SlotSchema {
    pub arity: Arity,
    pub required: bool,
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
}

impl SlotSchema {
    pub const fn single(required: bool) -> Self {
        Self {
            arity: Arity::Single,
            required,
            min_count: None,
            max_count: None,
        }
    }

    pub const fn multiple(required: bool) -> Self {
        Self {
            arity: Arity::Multiple,
            required,
            min_count: None,
            max_count: None,
        }
    }

    pub const fn min(self, count: usize) -> Self {
        Self {
            min_count: Some(count),
            ..self
        }
    }

    pub const fn max(self, count: usize) -> Self {
        Self {
            max_count: Some(count),
            ..self
        }
    }
}

/// JSON type expected for a config field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }

    /// Noun phrase used in validation messages
    pub fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "an integer",
            FieldType::Boolean => "a boolean",
            FieldType::Array => "an array",
            FieldType::Object => "an object",
        }
    }
}

/// A literal allowed value of a config field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Str(&'static str),
    Int(i64),
}

impl Literal {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Literal::Str(expected) => value.as_str() == Some(*expected),
            Literal::Int(expected) => value.as_i64() == Some(*expected),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str(s) => Value::from(*s),
            Literal::Int(n) => Value::from(*n),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),
            Literal::Int(n) => write!(f, "{}", n),
        }
    }
}

/// Declaration of one provider config field
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    /// Empty means any value of the right type is accepted
    pub allowed_values: &'static [Literal],
}

impl FieldSchema {
    pub const fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            allowed_values: &[],
        }
    }

    pub const fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            allowed_values: &[],
        }
    }

    pub const fn one_of(self, allowed_values: &'static [Literal]) -> Self {
        Self {
            allowed_values,
            ..self
        }
    }
}

/// Config schema of one provider
#[derive(Debug)]
pub struct ProviderSchema {
    pub name: &'static str,
    pub fields: &'static [(&'static str, FieldSchema)],
}

/// Registry entry of one node type
#[derive(Debug)]
pub struct NodeSchema {
    pub node_type: NodeType,
    pub inputs: &'static [(&'static str, SlotSchema)],
    pub providers: &'static [ProviderSchema],
}

impl NodeSchema {
    pub fn slot(&self, name: &str) -> Option<&SlotSchema> {
        self.inputs
            .iter()
            .find(|(slot, _)| *slot == name)
            .map(|(_, schema)| schema)
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderSchema> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name).collect()
    }
}

/// Registry entry for a known node type
pub fn schema_for(kind: NodeType) -> &'static NodeSchema {
    match kind {
        NodeType::Asset => &ASSET,
        NodeType::GenerateTalkingHead => &GENERATE_TALKING_HEAD,
        NodeType::GenerateAnimation => &GENERATE_ANIMATION,
        NodeType::GenerateVoiceover => &GENERATE_VOICEOVER,
        NodeType::RenderCode => &RENDER_CODE,
        NodeType::MixAudio => &MIX_AUDIO,
        NodeType::MergeVideos => &MERGE_VIDEOS,
        NodeType::ComposeVideo => &COMPOSE_VIDEO,
    }
}

/// Registry entry for a raw type tag, `None` for unknown types
pub fn lookup(node_type: &str) -> Option<&'static NodeSchema> {
    node_type.parse::<NodeType>().ok().map(schema_for)
}

// =============================================================================
// Registry
// =============================================================================

const MEDIA_TYPES: &[Literal] = &[
    Literal::Str("video"),
    Literal::Str("audio"),
    Literal::Str("image"),
];

const ASPECT_RATIOS: &[Literal] = &[
    Literal::Str("16:9"),
    Literal::Str("9:16"),
    Literal::Str("1:1"),
];

static ASSET: NodeSchema = NodeSchema {
    node_type: NodeType::Asset,
    inputs: &[],
    providers: &[
        ProviderSchema {
            name: "upload",
            fields: &[(
                "media_type",
                FieldSchema::required(FieldType::String).one_of(MEDIA_TYPES),
            )],
        },
        ProviderSchema {
            name: "url",
            fields: &[
                (
                    "media_type",
                    FieldSchema::required(FieldType::String).one_of(MEDIA_TYPES),
                ),
                ("source_url", FieldSchema::required(FieldType::String)),
            ],
        },
    ],
};

static GENERATE_TALKING_HEAD: NodeSchema = NodeSchema {
    node_type: NodeType::GenerateTalkingHead,
    inputs: &[("audio", SlotSchema::single(true))],
    providers: &[
        ProviderSchema {
            name: "heygen",
            fields: &[
                ("avatar_id", FieldSchema::required(FieldType::String)),
                ("background_color", FieldSchema::optional(FieldType::String)),
                (
                    "resolution",
                    FieldSchema::optional(FieldType::String)
                        .one_of(&[Literal::Str("720p"), Literal::Str("1080p")]),
                ),
            ],
        },
        ProviderSchema {
            name: "hedra",
            fields: &[
                ("character_image", FieldSchema::required(FieldType::String)),
                (
                    "aspect_ratio",
                    FieldSchema::optional(FieldType::String).one_of(ASPECT_RATIOS),
                ),
            ],
        },
    ],
};

static GENERATE_ANIMATION: NodeSchema = NodeSchema {
    node_type: NodeType::GenerateAnimation,
    inputs: &[("reference", SlotSchema::single(false))],
    providers: &[
        ProviderSchema {
            name: "runway",
            fields: &[
                ("prompt", FieldSchema::required(FieldType::String)),
                (
                    "duration",
                    FieldSchema::optional(FieldType::Integer)
                        .one_of(&[Literal::Int(5), Literal::Int(10)]),
                ),
                (
                    "ratio",
                    FieldSchema::optional(FieldType::String).one_of(ASPECT_RATIOS),
                ),
            ],
        },
        ProviderSchema {
            name: "veo",
            fields: &[
                ("prompt", FieldSchema::required(FieldType::String)),
                ("negative_prompt", FieldSchema::optional(FieldType::String)),
                (
                    "aspect_ratio",
                    FieldSchema::optional(FieldType::String).one_of(ASPECT_RATIOS),
                ),
                ("generate_audio", FieldSchema::optional(FieldType::Boolean)),
            ],
        },
    ],
};

static GENERATE_VOICEOVER: NodeSchema = NodeSchema {
    node_type: NodeType::GenerateVoiceover,
    inputs: &[],
    providers: &[
        ProviderSchema {
            name: "elevenlabs",
            fields: &[
                ("text", FieldSchema::required(FieldType::String)),
                ("voice_id", FieldSchema::required(FieldType::String)),
                ("model_id", FieldSchema::optional(FieldType::String)),
                ("voice_settings", FieldSchema::optional(FieldType::Object)),
            ],
        },
        ProviderSchema {
            name: "openai",
            fields: &[
                ("text", FieldSchema::required(FieldType::String)),
                (
                    "voice",
                    FieldSchema::required(FieldType::String).one_of(&[
                        Literal::Str("alloy"),
                        Literal::Str("echo"),
                        Literal::Str("fable"),
                        Literal::Str("onyx"),
                        Literal::Str("nova"),
                        Literal::Str("shimmer"),
                    ]),
                ),
            ],
        },
    ],
};

static RENDER_CODE: NodeSchema = NodeSchema {
    node_type: NodeType::RenderCode,
    inputs: &[],
    providers: &[
        ProviderSchema {
            name: "remotion",
            fields: &[
                ("code", FieldSchema::required(FieldType::String)),
                ("duration_in_frames", FieldSchema::optional(FieldType::Integer)),
                ("fps", FieldSchema::optional(FieldType::Integer)),
                ("props", FieldSchema::optional(FieldType::Object)),
            ],
        },
        ProviderSchema {
            name: "manim",
            fields: &[
                ("code", FieldSchema::required(FieldType::String)),
                ("scene_name", FieldSchema::required(FieldType::String)),
                (
                    "quality",
                    FieldSchema::optional(FieldType::String).one_of(&[
                        Literal::Str("low"),
                        Literal::Str("medium"),
                        Literal::Str("high"),
                    ]),
                ),
            ],
        },
    ],
};

static MIX_AUDIO: NodeSchema = NodeSchema {
    node_type: NodeType::MixAudio,
    inputs: &[
        ("video", SlotSchema::single(true)),
        ("tracks", SlotSchema::multiple(true).min(1).max(8)),
    ],
    providers: &[ProviderSchema {
        name: "ffmpeg",
        fields: &[
            ("volumes", FieldSchema::optional(FieldType::Array)),
            ("normalize", FieldSchema::optional(FieldType::Boolean)),
            ("keep_original_audio", FieldSchema::optional(FieldType::Boolean)),
        ],
    }],
};

static MERGE_VIDEOS: NodeSchema = NodeSchema {
    node_type: NodeType::MergeVideos,
    inputs: &[("segments", SlotSchema::multiple(true).min(2))],
    providers: &[ProviderSchema {
        name: "ffmpeg",
        fields: &[
            (
                "transition",
                FieldSchema::optional(FieldType::String).one_of(&[
                    Literal::Str("none"),
                    Literal::Str("fade"),
                    Literal::Str("crossfade"),
                ]),
            ),
            ("transition_duration_ms", FieldSchema::optional(FieldType::Integer)),
        ],
    }],
};

static COMPOSE_VIDEO: NodeSchema = NodeSchema {
    node_type: NodeType::ComposeVideo,
    inputs: &[
        ("background", SlotSchema::single(true)),
        ("overlays", SlotSchema::multiple(false).max(4)),
        ("audio", SlotSchema::single(false)),
    ],
    providers: &[ProviderSchema {
        name: "ffmpeg",
        fields: &[
            (
                "layout",
                FieldSchema::required(FieldType::String).one_of(&[
                    Literal::Str("picture-in-picture"),
                    Literal::Str("side-by-side"),
                    Literal::Str("stacked"),
                ]),
            ),
            ("overlay_position", FieldSchema::optional(FieldType::String)),
            ("overlay_scale_percent", FieldSchema::optional(FieldType::Integer)),
        ],
    }],
};

//! Deltas targeting streams.

use super::{object, parse_args, DeltaMeta, DeltaStatus, ModelDelta};
use crate::error::{CloudError, Result};
use crate::types::{Mdo, Stream, Unit};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Change of a stream's data label. The old label may be unset.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLabelDelta {
    meta: DeltaMeta,
    old_label: Option<String>,
    new_label: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelArgs {
    #[serde(default)]
    old_label: Option<String>,
    new_label: String,
}

impl StreamLabelDelta {
    /// Storage tag
    pub const CLASSNAME: &'static str = "StreamLabelDelta";

    /// Record a label change on the stream `slug`.
    pub fn new(
        old_label: Option<String>,
        new_label: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        StreamLabelDelta {
            meta: DeltaMeta::new(slug),
            old_label,
            new_label: new_label.into(),
        }
    }

    /// Rebuild from stored arguments.
    pub fn deserialize(guid: String, slug: String, args: &Map<String, Value>) -> Result<Self> {
        let args: LabelArgs = parse_args(Self::CLASSNAME, args)?;
        Ok(StreamLabelDelta {
            meta: DeltaMeta::restore(guid, slug),
            old_label: args.old_label,
            new_label: args.new_label,
        })
    }

    /// Label after the edit
    pub fn new_label(&self) -> &str {
        &self.new_label
    }
}

impl ModelDelta<Stream> for StreamLabelDelta {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, stream: &Stream) -> DeltaStatus {
        if stream.data_label.as_deref() == Some(self.new_label.as_str()) {
            DeltaStatus::Outdated
        } else if stream.data_label != self.old_label {
            DeltaStatus::Conflicted
        } else {
            DeltaStatus::Applies
        }
    }

    fn patch(&self, _stream: &Stream) -> Map<String, Value> {
        object(json!({ "data_label": self.new_label }))
    }

    fn apply(&self, stream: &mut Stream) {
        stream.data_label = Some(self.new_label.clone());
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldLabel": self.old_label,
            "newLabel": self.new_label,
        }))
    }
}

/// Change of a stream's scaling factors and scaling type.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMDODelta {
    meta: DeltaMeta,
    old_mdo: Mdo,
    old_type: Option<String>,
    new_mdo: Mdo,
    new_type: Option<String>,
}

#[derive(Deserialize)]
struct MdoArgs {
    #[serde(rename = "oldMDO")]
    old_mdo: Mdo,
    #[serde(rename = "oldType", default)]
    old_type: Option<String>,
    #[serde(rename = "newMDO")]
    new_mdo: Mdo,
    #[serde(rename = "newType", default)]
    new_type: Option<String>,
}

impl StreamMDODelta {
    /// Storage tag
    pub const CLASSNAME: &'static str = "StreamMDODelta";

    /// Record a scaling change on the stream `slug`.
    pub fn new(
        old_mdo: Mdo,
        old_type: Option<String>,
        new_mdo: Mdo,
        new_type: Option<String>,
        slug: impl Into<String>,
    ) -> Self {
        StreamMDODelta {
            meta: DeltaMeta::new(slug),
            old_mdo,
            old_type,
            new_mdo,
            new_type,
        }
    }

    /// Rebuild from stored arguments.
    pub fn deserialize(guid: String, slug: String, args: &Map<String, Value>) -> Result<Self> {
        let args: MdoArgs = parse_args(Self::CLASSNAME, args)?;
        Ok(StreamMDODelta {
            meta: DeltaMeta::restore(guid, slug),
            old_mdo: args.old_mdo,
            old_type: args.old_type,
            new_mdo: args.new_mdo,
            new_type: args.new_type,
        })
    }

    /// Scaling after the edit
    pub fn new_mdo(&self) -> &Mdo {
        &self.new_mdo
    }
}

impl ModelDelta<Stream> for StreamMDODelta {
    fn classname(&self) -> &'static str {
        Self::CLASSNAME
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, stream: &Stream) -> DeltaStatus {
        if stream.mdo == self.new_mdo && stream.mdo_type == self.new_type {
            DeltaStatus::Outdated
        } else if stream.mdo != self.old_mdo || stream.mdo_type != self.old_type {
            DeltaStatus::Conflicted
        } else {
            DeltaStatus::Applies
        }
    }

    fn patch(&self, _stream: &Stream) -> Map<String, Value> {
        object(json!({
            "mdo_type": self.new_type,
            "mdo_label": self.new_mdo.label,
            "multiplication_factor": self.new_mdo.m,
            "division_factor": self.new_mdo.d,
            "offset": self.new_mdo.o,
        }))
    }

    fn apply(&self, stream: &mut Stream) {
        stream.mdo.set_from_mdo(&self.new_mdo);
        stream.mdo_type.clone_from(&self.new_type);
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldMDO": self.old_mdo,
            "oldType": self.old_type,
            "newMDO": self.new_mdo,
            "newType": self.new_type,
        }))
    }
}

/// Which unit slot of a stream a [`StreamUnitsDelta`] edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitDirection {
    /// `input_unit`, stored as `0`
    Input,
    /// `output_unit`, stored as `1`
    Output,
}

impl UnitDirection {
    /// Storage tag of the delta kind for this direction.
    pub fn classname(&self) -> &'static str {
        match self {
            UnitDirection::Input => StreamUnitsDelta::INPUT_CLASSNAME,
            UnitDirection::Output => StreamUnitsDelta::OUTPUT_CLASSNAME,
        }
    }

    /// Cloud field name for this slot.
    pub fn field(&self) -> &'static str {
        match self {
            UnitDirection::Input => "input_unit",
            UnitDirection::Output => "output_unit",
        }
    }

    fn code(&self) -> u8 {
        match self {
            UnitDirection::Input => 0,
            UnitDirection::Output => 1,
        }
    }

    fn slot<'a>(&self, stream: &'a Stream) -> Option<&'a Unit> {
        match self {
            UnitDirection::Input => stream.input_unit.as_ref(),
            UnitDirection::Output => stream.output_unit.as_ref(),
        }
    }

    fn slot_mut<'a>(&self, stream: &'a mut Stream) -> &'a mut Option<Unit> {
        match self {
            UnitDirection::Input => &mut stream.input_unit,
            UnitDirection::Output => &mut stream.output_unit,
        }
    }
}

/// Change of a stream's input or output units.
///
/// Units are compared by slug only. The old unit is absent when the stream
/// never had units set; the new unit is always required.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamUnitsDelta {
    meta: DeltaMeta,
    old_unit: Option<Unit>,
    new_unit: Unit,
    direction: UnitDirection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitsArgs {
    #[serde(default)]
    old_unit: Option<Unit>,
    #[serde(default)]
    new_unit: Option<Unit>,
}

impl StreamUnitsDelta {
    /// Storage tag for input unit changes
    pub const INPUT_CLASSNAME: &'static str = "StreamInputUnitsDelta";
    /// Storage tag for output unit changes
    pub const OUTPUT_CLASSNAME: &'static str = "StreamOutputUnitsDelta";

    /// Record a unit change.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::InvalidArgument`] when `new_unit` is `None`: a unit
    /// change is always a change to a specific unit.
    pub fn try_new(
        old_unit: Option<Unit>,
        new_unit: Option<Unit>,
        direction: UnitDirection,
        slug: impl Into<String>,
    ) -> Result<Self> {
        Self::build(DeltaMeta::new(slug), old_unit, new_unit, direction)
    }

    /// Record an input unit change on the stream `slug`.
    pub fn input(old_unit: Option<Unit>, new_unit: Unit, slug: impl Into<String>) -> Self {
        StreamUnitsDelta {
            meta: DeltaMeta::new(slug),
            old_unit,
            new_unit,
            direction: UnitDirection::Input,
        }
    }

    /// Record an output unit change on the stream `slug`.
    pub fn output(old_unit: Option<Unit>, new_unit: Unit, slug: impl Into<String>) -> Self {
        StreamUnitsDelta {
            meta: DeltaMeta::new(slug),
            old_unit,
            new_unit,
            direction: UnitDirection::Output,
        }
    }

    /// Rebuild an input or output unit change from stored arguments.
    pub fn deserialize(
        direction: UnitDirection,
        guid: String,
        slug: String,
        args: &Map<String, Value>,
    ) -> Result<Self> {
        let args: UnitsArgs = parse_args(direction.classname(), args)?;
        Self::build(
            DeltaMeta::restore(guid, slug),
            args.old_unit,
            args.new_unit,
            direction,
        )
    }

    fn build(
        meta: DeltaMeta,
        old_unit: Option<Unit>,
        new_unit: Option<Unit>,
        direction: UnitDirection,
    ) -> Result<Self> {
        let new_unit = new_unit.ok_or_else(|| {
            CloudError::InvalidArgument(
                "You must always set a valid new unit in StreamUnitsDelta".to_string(),
            )
        })?;

        Ok(StreamUnitsDelta {
            meta,
            old_unit,
            new_unit,
            direction,
        })
    }

    /// Slot this delta edits
    pub fn direction(&self) -> UnitDirection {
        self.direction
    }

    /// Unit after the edit
    pub fn new_unit(&self) -> &Unit {
        &self.new_unit
    }
}

impl ModelDelta<Stream> for StreamUnitsDelta {
    fn classname(&self) -> &'static str {
        self.direction.classname()
    }

    fn meta(&self) -> &DeltaMeta {
        &self.meta
    }

    fn check(&self, stream: &Stream) -> DeltaStatus {
        let current = self.direction.slot(stream).map(|u| u.slug.as_str());
        let old = self.old_unit.as_ref().map(|u| u.slug.as_str());

        if current == Some(self.new_unit.slug.as_str()) {
            DeltaStatus::Outdated
        } else if current == old {
            DeltaStatus::Applies
        } else {
            DeltaStatus::Conflicted
        }
    }

    fn patch(&self, _stream: &Stream) -> Map<String, Value> {
        let mut patch = Map::new();
        patch.insert(
            self.direction.field().to_string(),
            Value::String(self.new_unit.slug.clone()),
        );
        patch
    }

    fn apply(&self, stream: &mut Stream) {
        match self.direction.slot_mut(stream) {
            Some(unit) => unit.set_from_unit(&self.new_unit),
            slot @ None => *slot = Some(self.new_unit.clone()),
        }
    }

    fn serialize_arguments(&self) -> Map<String, Value> {
        object(json!({
            "oldUnit": self.old_unit,
            "newUnit": self.new_unit,
            "type": self.direction.code(),
        }))
    }
}

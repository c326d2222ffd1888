// Aspect layers
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Layers and their order.
//!
//! A [`Layer`] identifies the aspect
//!   (and optionally a named sub-layer of that aspect)
//!   that contributes a declaration.
//! The order in which layers apply is supplied as input through a
//!   [`LayerOrder`];
//!     the linker never computes it.
//!
//! Every declaration of a member is assigned a [`LayerPos`]:
//!   position `0` is reserved for the source declaration,
//!   and the `i`th layer of the order is at position `i+1`.
//! Positions are small integers so that the resolver can find `Base`,
//!   `Self` and `Final` by index arithmetic.

use super::error::LinkError;
use crate::{
    global,
    span::UNKNOWN_SPAN,
    syntax::ast::{CompilationUnit, ExprKind},
};
use fxhash::FxHashMap;
use std::fmt::{self, Display};

/// Name of the assembly attribute supplying the layer order.
pub const LAYER_ORDER_ATTR: &str = "LayerOrder";

/// An aspect layer,
///   written `aspect` or `aspect:sublayer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Layer {
    aspect: String,
    sub: Option<String>,
}

impl Layer {
    pub fn new<A: Into<String>>(aspect: A, sub: Option<String>) -> Self {
        Self {
            aspect: aspect.into(),
            sub,
        }
    }

    /// Parse the textual form of a layer.
    ///
    /// Both the aspect and any sub-layer must be non-empty identifiers.
    pub fn parse(s: &str) -> Option<Self> {
        let is_ident = |part: &str| {
            !part.is_empty()
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };

        match s.split_once(':') {
            Some((aspect, sub)) if is_ident(aspect) && is_ident(sub) => {
                Some(Self::new(aspect, Some(sub.into())))
            }
            None if is_ident(s) => Some(Self::new(s, None)),
            _ => None,
        }
    }

    pub fn aspect(&self) -> &str {
        &self.aspect
    }

    pub fn sub(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    /// Suffix used to name a retained declaration of this layer,
    ///   e.g. `Logging_Enter`.
    pub fn suffix(&self) -> String {
        match &self.sub {
            Some(sub) => format!("{}_{}", self.aspect, sub),
            None => self.aspect.clone(),
        }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{}:{}", self.aspect, sub),
            None => write!(f, "{}", self.aspect),
        }
    }
}

/// Position of a declaration within an override chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerPos(global::LayerPosSize);

impl LayerPos {
    /// Position of the source declaration.
    pub const SOURCE: Self = Self(0);

    /// Position of the `index`th layer of a [`LayerOrder`].
    fn of_layer(index: usize) -> Option<Self> {
        global::LayerPosSize::try_from(index + 1).ok().map(Self)
    }

    pub fn is_source(self) -> bool {
        self == Self::SOURCE
    }

    /// Index into a [`LayerOrder`],
    ///   or [`None`] for the source position.
    pub fn layer_index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl Display for LayerPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Failure to find a layer in a [`LayerOrder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerLookupError {
    /// The layer does not appear in the order.
    Unknown,

    /// The layer appears more than once,
    ///   which would require it to both precede and follow other
    ///   layers.
    Ambiguous,
}

/// Total order of layers,
///   innermost (first applied) first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerOrder {
    layers: Vec<Layer>,
    index: FxHashMap<Layer, Result<LayerPos, LayerLookupError>>,
}

impl LayerOrder {
    /// Build an order from layers listed innermost first.
    ///
    /// Layers listed more than once are retained,
    ///   but any lookup of them fails with
    ///   [`LayerLookupError::Ambiguous`];
    ///     this is fatal only to the members that use them.
    pub fn new(layers: Vec<Layer>) -> Option<Self> {
        let mut index = FxHashMap::default();

        for (i, layer) in layers.iter().enumerate() {
            let pos = LayerPos::of_layer(i)?;

            index
                .entry(layer.clone())
                .and_modify(|found| *found = Err(LayerLookupError::Ambiguous))
                .or_insert(Ok(pos));
        }

        Some(Self { layers, index })
    }

    /// Read the order from the unit's `LayerOrder` assembly attributes.
    ///
    /// Multiple attributes are concatenated in source order.
    /// A unit without the attribute has an empty order.
    pub fn from_unit(unit: &CompilationUnit) -> Result<Self, LinkError> {
        let mut layers = Vec::new();
        let mut last_span = None;

        for attr in unit
            .attrs
            .iter()
            .filter(|attr| attr.name.name == LAYER_ORDER_ATTR)
        {
            last_span = Some(attr.span);

            for arg in &attr.args {
                let layer = match &arg.kind {
                    ExprKind::Str(s) => Layer::parse(s),
                    _ => None,
                };

                layers.push(layer.ok_or(LinkError::InvalidLayerName(arg.span))?);
            }
        }

        let count = layers.len();

        Self::new(layers).ok_or_else(|| {
            LinkError::TooManyLayers(last_span.unwrap_or(UNKNOWN_SPAN), count)
        })
    }

    /// Position of `layer`.
    pub fn position(&self, layer: &Layer) -> Result<LayerPos, LayerLookupError> {
        self.index
            .get(layer)
            .copied()
            .unwrap_or(Err(LayerLookupError::Unknown))
    }

    /// Layer at the given position,
    ///   or [`None`] for the source position.
    pub fn layer(&self, pos: LayerPos) -> Option<&Layer> {
        pos.layer_index().and_then(|i| self.layers.get(i))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{span::dummy::DUMMY_CONTEXT, syntax::parse::parse};

    fn l(s: &str) -> Layer {
        Layer::parse(s).unwrap()
    }

    #[test]
    fn parses_layer_names() {
        assert_eq!(Some(Layer::new("A", None)), Layer::parse("A"));
        assert_eq!(
            Some(Layer::new("Log", Some("Enter".into()))),
            Layer::parse("Log:Enter")
        );
        assert_eq!(None, Layer::parse(""));
        assert_eq!(None, Layer::parse("A:"));
        assert_eq!(None, Layer::parse(":B"));
        assert_eq!(None, Layer::parse("A:B:C"));
        assert_eq!(None, Layer::parse("A B"));
    }

    #[test]
    fn display_and_suffix() {
        assert_eq!("Log:Enter", l("Log:Enter").to_string());
        assert_eq!("Log_Enter", l("Log:Enter").suffix());
        assert_eq!("Log", l("Log").suffix());
    }

    #[test]
    fn positions_follow_order_after_source() {
        let sut = LayerOrder::new(vec![l("A"), l("B:X"), l("C")]).unwrap();

        let a = sut.position(&l("A")).unwrap();
        let b = sut.position(&l("B:X")).unwrap();
        let c = sut.position(&l("C")).unwrap();

        assert!(LayerPos::SOURCE < a && a < b && b < c);
        assert_eq!(Some(&l("B:X")), sut.layer(b));
        assert_eq!(None, sut.layer(LayerPos::SOURCE));
        assert_eq!(Some(1), b.layer_index());
    }

    #[test]
    fn unknown_and_duplicate_layers_fail_lookup() {
        let sut = LayerOrder::new(vec![l("A"), l("B"), l("A")]).unwrap();

        assert_eq!(Err(LayerLookupError::Unknown), sut.position(&l("Z")));
        assert_eq!(Err(LayerLookupError::Ambiguous), sut.position(&l("A")));
        assert!(sut.position(&l("B")).is_ok());
    }

    #[test]
    fn reads_order_from_assembly_attributes() {
        let parsed = parse(
            DUMMY_CONTEXT,
            r#"[assembly: LayerOrder("A", "B:Sub")]
               [assembly: Other(1)]
               [assembly: LayerOrder("C")]"#,
        )
        .unwrap();

        let sut = LayerOrder::from_unit(&parsed.unit).unwrap();

        assert_eq!(3, sut.len());
        assert!(sut.position(&l("A")).unwrap() < sut.position(&l("C")).unwrap());
    }

    #[test]
    fn rejects_malformed_layer_names() {
        let parsed =
            parse(DUMMY_CONTEXT, r#"[assembly: LayerOrder("A", 5)]"#).unwrap();

        assert!(matches!(
            LayerOrder::from_unit(&parsed.unit),
            Err(LinkError::InvalidLayerName(_))
        ));
    }
}

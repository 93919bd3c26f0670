//! Registered units of work.
//!
//! A [`Node`] is a constructor erased behind a uniform invocation closure,
//! together with the capability keys it consumes and produces. The
//! [`Construct`] trait performs the erasure: it is implemented for any
//! `Fn(Arc<A1>, ..., Arc<An>) -> O` where every input is a [`Resource`]
//! and the return shape is zero, one, or a tuple of output slots, each
//! slot either a plain resource or a `Result` carrying one. A bare
//! `Result<(), E>` registers a fallible init step with no outputs.

use crate::cache::ValueCache;
use rigging_core::{BoxError, CapabilityKey, OutputSlot, Resource};
use rigging_graph::GraphNode;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value produced by one output slot, ready for the cache.
pub struct Produced {
    key: CapabilityKey,
    value: Arc<dyn Any + Send + Sync>,
    release: Option<rigging_core::ReleaseFn>,
}

impl Produced {
    /// Wrap a resource value under its capability key, capturing its
    /// release action if it has one.
    #[must_use]
    pub fn of<T: Resource>(value: T) -> Self {
        let value = Arc::new(value);
        let release = Arc::clone(&value).release();
        Self {
            key: CapabilityKey::of::<T>(),
            value,
            release,
        }
    }

    /// The capability this value satisfies.
    #[must_use]
    pub fn key(&self) -> CapabilityKey {
        self.key
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        CapabilityKey,
        Arc<dyn Any + Send + Sync>,
        Option<rigging_core::ReleaseFn>,
    ) {
        (self.key, self.value, self.release)
    }
}

/// Failure raised while invoking a node.
pub(crate) enum InvokeError {
    /// A required input was absent from the cache.
    MissingValue(CapabilityKey),
    /// A fallible output slot carried an error.
    Constructor(BoxError),
}

pub(crate) type Invoke = Box<dyn FnMut(&ValueCache) -> Result<Vec<Produced>, InvokeError> + Send>;

/// A registered unit of work: an erased constructor plus its declared
/// input and output capability keys.
pub struct Node {
    label: String,
    inputs: Vec<CapabilityKey>,
    outputs: Vec<OutputSlot>,
    call: Invoke,
}

impl Node {
    pub(crate) fn from_parts(
        label: String,
        inputs: Vec<CapabilityKey>,
        outputs: Vec<OutputSlot>,
        call: Invoke,
    ) -> Self {
        Self {
            label,
            inputs,
            outputs,
            call,
        }
    }

    /// Human-readable label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared input keys, in parameter order.
    #[must_use]
    pub fn input_keys(&self) -> &[CapabilityKey] {
        &self.inputs
    }

    /// Declared output slots, in return order.
    #[must_use]
    pub fn output_slots(&self) -> &[OutputSlot] {
        &self.outputs
    }

    pub(crate) fn invoke(&mut self, cache: &ValueCache) -> Result<Vec<Produced>, InvokeError> {
        (self.call)(cache)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl GraphNode for Node {
    type Key = CapabilityKey;

    fn label(&self) -> &str {
        &self.label
    }

    fn inputs(&self) -> Vec<CapabilityKey> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<CapabilityKey> {
        self.outputs.iter().map(|slot| slot.key).collect()
    }
}

/// Marker for an infallible output slot (`T`).
pub struct Value;

/// Marker for a fallible output slot (`Result<T, E>`).
pub struct Fallible;

/// One return slot of a constructor: a resource value, or a `Result`
/// carrying one.
///
/// The marker parameter `M` distinguishes the two shapes. It is inferred
/// at the registration site and never named by callers.
pub trait Slot<M> {
    /// The declared slot.
    fn slot() -> OutputSlot;

    /// Split into the produced value or the error that aborts the run.
    ///
    /// # Errors
    ///
    /// Returns the carried error for a fallible slot holding `Err`.
    fn unpack(self) -> Result<Produced, BoxError>;
}

impl<T: Resource> Slot<Value> for T {
    fn slot() -> OutputSlot {
        OutputSlot::value(CapabilityKey::of::<T>())
    }

    fn unpack(self) -> Result<Produced, BoxError> {
        Ok(Produced::of(self))
    }
}

impl<T: Resource, E: Into<BoxError>> Slot<Fallible> for Result<T, E> {
    fn slot() -> OutputSlot {
        OutputSlot::fallible(CapabilityKey::of::<T>())
    }

    fn unpack(self) -> Result<Produced, BoxError> {
        match self {
            Ok(value) => Ok(Produced::of(value)),
            Err(err) => Err(err.into()),
        }
    }
}

/// The full return shape of a constructor: zero, one, or a tuple of
/// output slots, or the fallible unit `Result<(), E>` for an init step
/// that can fail without producing a value.
pub trait IntoOutputs<M> {
    /// Declared slots, in return order.
    fn slots() -> Vec<OutputSlot>;

    /// Unpack every slot, stopping at the first fallible error.
    ///
    /// A failing constructor contributes nothing to the cache: values
    /// unpacked before the error are dropped with it.
    ///
    /// # Errors
    ///
    /// Returns the first error carried by a fallible slot.
    fn into_produced(self) -> Result<Vec<Produced>, BoxError>;
}

impl IntoOutputs<()> for () {
    fn slots() -> Vec<OutputSlot> {
        Vec::new()
    }

    fn into_produced(self) -> Result<Vec<Produced>, BoxError> {
        Ok(Vec::new())
    }
}

// Fallible init step: declares no slots, the error still aborts the run.
impl<E: Into<BoxError>> IntoOutputs<Fallible> for Result<(), E> {
    fn slots() -> Vec<OutputSlot> {
        Vec::new()
    }

    fn into_produced(self) -> Result<Vec<Produced>, BoxError> {
        match self {
            Ok(()) => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl<S, M> IntoOutputs<(M,)> for S
where
    S: Slot<M>,
{
    fn slots() -> Vec<OutputSlot> {
        vec![S::slot()]
    }

    fn into_produced(self) -> Result<Vec<Produced>, BoxError> {
        Ok(vec![self.unpack()?])
    }
}

macro_rules! impl_tuple_outputs {
    ($(($S:ident, $M:ident, $v:ident)),+) => {
        impl<$($S, $M),+> IntoOutputs<($($M,)+)> for ($($S,)+)
        where
            $($S: Slot<$M>,)+
        {
            fn slots() -> Vec<OutputSlot> {
                vec![$($S::slot()),+]
            }

            fn into_produced(self) -> Result<Vec<Produced>, BoxError> {
                let ($($v,)+) = self;
                Ok(vec![$($v.unpack()?),+])
            }
        }
    };
}

impl_tuple_outputs!((S1, M1, s1), (S2, M2, s2));
impl_tuple_outputs!((S1, M1, s1), (S2, M2, s2), (S3, M3, s3));
impl_tuple_outputs!((S1, M1, s1), (S2, M2, s2), (S3, M3, s3), (S4, M4, s4));
impl_tuple_outputs!(
    (S1, M1, s1),
    (S2, M2, s2),
    (S3, M3, s3),
    (S4, M4, s4),
    (S5, M5, s5)
);

/// A callable the container can register: declares the capability keys it
/// consumes and produces, and erases into a [`Node`].
///
/// Implemented for `Fn(Arc<A1>, ..., Arc<An>) -> O` up to eight inputs,
/// where every `Ai` is a [`Resource`] and `O` is an [`IntoOutputs`]
/// shape. Closure parameters must be annotated so the input types are
/// known at the registration site:
///
/// ```
/// use rigging_core::Resource;
/// use rigging_runtime::Construct;
/// use std::sync::Arc;
///
/// struct Config { port: u16 }
/// impl Resource for Config {}
///
/// struct Server { port: u16 }
/// impl Resource for Server {}
///
/// fn register<C: Construct<M>, M>(constructor: C) {
///     let node = constructor.into_node();
///     assert_eq!(node.input_keys().len(), 1);
///     assert_eq!(node.output_slots().len(), 1);
/// }
///
/// register(|cfg: Arc<Config>| Server { port: cfg.port });
/// ```
pub trait Construct<M>: Send + Sized + 'static {
    /// Input keys, in parameter order.
    fn inputs() -> Vec<CapabilityKey>;

    /// Output slots, in return order.
    fn outputs() -> Vec<OutputSlot>;

    /// Erase into a registered node.
    fn into_node(self) -> Node;
}

macro_rules! impl_construct {
    ($($A:ident),*) => {
        #[allow(non_snake_case)]
        impl<F, O, OM $(, $A)*> Construct<(($($A,)*), OM)> for F
        where
            F: Fn($(Arc<$A>,)*) -> O + Send + 'static,
            O: IntoOutputs<OM>,
            $($A: Resource,)*
        {
            fn inputs() -> Vec<CapabilityKey> {
                vec![$(CapabilityKey::of::<$A>(),)*]
            }

            fn outputs() -> Vec<OutputSlot> {
                O::slots()
            }

            fn into_node(self) -> Node {
                let call = Box::new(move |_cache: &ValueCache| {
                    $(
                        let $A: Arc<$A> = _cache
                            .get()
                            .ok_or_else(|| InvokeError::MissingValue(CapabilityKey::of::<$A>()))?;
                    )*
                    (self)($($A,)*)
                        .into_produced()
                        .map_err(InvokeError::Constructor)
                });
                Node::from_parts(
                    std::any::type_name::<F>().to_string(),
                    Self::inputs(),
                    O::slots(),
                    call,
                )
            }
        }
    };
}

impl_construct!();
impl_construct!(A1);
impl_construct!(A1, A2);
impl_construct!(A1, A2, A3);
impl_construct!(A1, A2, A3, A4);
impl_construct!(A1, A2, A3, A4, A5);
impl_construct!(A1, A2, A3, A4, A5, A6);
impl_construct!(A1, A2, A3, A4, A5, A6, A7);
impl_construct!(A1, A2, A3, A4, A5, A6, A7, A8);

#[cfg(test)]
mod tests {
    use super::*;

    struct Config;

    impl Resource for Config {}

    struct Database;

    impl Resource for Database {}

    struct Server;

    impl Resource for Server {}

    fn manifest<C: Construct<M>, M>(_constructor: &C) -> (Vec<CapabilityKey>, Vec<OutputSlot>) {
        (C::inputs(), C::outputs())
    }

    #[test]
    fn test_zero_input_single_output() {
        let constructor = || Config;
        let (inputs, outputs) = manifest(&constructor);
        assert!(inputs.is_empty());
        assert_eq!(outputs, vec![OutputSlot::value(CapabilityKey::of::<Config>())]);
    }

    #[test]
    fn test_inputs_in_parameter_order() {
        let constructor = |_cfg: Arc<Config>, _db: Arc<Database>| Server;
        let (inputs, outputs) = manifest(&constructor);
        assert_eq!(
            inputs,
            vec![CapabilityKey::of::<Config>(), CapabilityKey::of::<Database>()]
        );
        assert_eq!(outputs, vec![OutputSlot::value(CapabilityKey::of::<Server>())]);
    }

    #[test]
    fn test_fallible_slot_is_marked() {
        let constructor = |_cfg: Arc<Config>| -> Result<Database, BoxError> { Ok(Database) };
        let (_, outputs) = manifest(&constructor);
        assert_eq!(
            outputs,
            vec![OutputSlot::fallible(CapabilityKey::of::<Database>())]
        );
    }

    #[test]
    fn test_tuple_output_with_mixed_slots() {
        let constructor =
            || -> (Config, Result<Database, BoxError>) { (Config, Ok(Database)) };
        let (_, outputs) = manifest(&constructor);
        assert_eq!(
            outputs,
            vec![
                OutputSlot::value(CapabilityKey::of::<Config>()),
                OutputSlot::fallible(CapabilityKey::of::<Database>()),
            ]
        );
    }

    #[test]
    fn test_empty_output_shape() {
        let constructor = |_cfg: Arc<Config>| ();
        let (inputs, outputs) = manifest(&constructor);
        assert_eq!(inputs.len(), 1);
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_fallible_unit_shape_declares_no_slots() {
        let constructor = |_cfg: Arc<Config>| -> Result<(), BoxError> { Ok(()) };
        let (inputs, outputs) = manifest(&constructor);
        assert_eq!(inputs.len(), 1);
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_fallible_unit_error_aborts_invoke() {
        let constructor = || -> Result<(), BoxError> { Err("init failed".into()) };
        let mut node = constructor.into_node();
        let cache = ValueCache::new();

        match node.invoke(&cache) {
            Err(InvokeError::Constructor(err)) => {
                assert_eq!(err.to_string(), "init failed");
            }
            _ => panic!("expected constructor error"),
        }
    }

    #[test]
    fn test_invoke_produces_declared_values() {
        let mut node = (|| Config).into_node();
        let cache = ValueCache::new();

        let produced = node.invoke(&cache).ok().expect("constructor succeeds");
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].key(), CapabilityKey::of::<Config>());
    }

    #[test]
    fn test_invoke_without_input_reports_missing_value() {
        let mut node = (|_cfg: Arc<Config>| Server).into_node();
        let cache = ValueCache::new();

        match node.invoke(&cache) {
            Err(InvokeError::MissingValue(key)) => {
                assert_eq!(key, CapabilityKey::of::<Config>());
            }
            _ => panic!("expected missing value"),
        }
    }

    #[test]
    fn test_fallible_error_aborts_whole_tuple() {
        let constructor = || -> (Config, Result<Database, BoxError>) {
            (Config, Err("database offline".into()))
        };
        let mut node = constructor.into_node();
        let cache = ValueCache::new();

        match node.invoke(&cache) {
            Err(InvokeError::Constructor(err)) => {
                assert_eq!(err.to_string(), "database offline");
            }
            _ => panic!("expected constructor error"),
        }
    }

    #[test]
    fn test_error_in_first_slot_skips_later_slots() {
        let constructor = || -> (Result<Database, BoxError>, Config) {
            (Err("database offline".into()), Config)
        };
        let mut node = constructor.into_node();
        let cache = ValueCache::new();

        assert!(matches!(
            node.invoke(&cache),
            Err(InvokeError::Constructor(_))
        ));
    }

    #[test]
    fn test_node_label_names_the_callable() {
        let node = (|| Config).into_node();
        assert!(node.label().contains("closure"));
    }
}

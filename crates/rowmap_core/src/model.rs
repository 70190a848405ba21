//! Model trait: the link between a record type and its schema.

/// A mappable model type.
///
/// A model supplies its annotation block as a constant; the schema extractor
/// parses it once and caches the result process-wide under [`Model::NAME`].
///
/// # Example
///
/// ```rust
/// use rowmap_core::Model;
///
/// struct User;
///
/// impl Model for User {
///     const NAME: &'static str = "User";
///     const SCHEMA: &'static str = "
///         @collection users
///         @property integer(11) id user_id - unique
///         @property string(255) name - null
///     ";
/// }
/// ```
pub trait Model: 'static {
    /// Unique model name, the cache key for the parsed schema.
    const NAME: &'static str;

    /// The annotation block describing collection, connection and
    /// properties.
    const SCHEMA: &'static str;
}

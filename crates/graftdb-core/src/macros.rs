// entity_model
/// Declare an entity marker type together with its static `EntityModel`.
///
/// ```ignore
/// entity_model! {
///     pub City,
///     path = "demo::City",
///     entity_name = "City",
///     primary_key = "id",
///     parent = Place,
///     fields = [
///         EntityFieldModel::scalar("country", ScalarKind::Text),
///     ],
/// }
/// ```
#[macro_export]
macro_rules! entity_model {
    (
        $vis:vis $name:ident,
        path = $path:expr,
        entity_name = $entity_name:expr,
        primary_key = $primary_key:expr,
        $( parent = $parent:ty, )?
        fields = [ $( $field:expr ),* $(,)? ] $(,)?
    ) => {
        $vis struct $name;

        impl $name {
            const FIELD_MODELS: [$crate::model::field::EntityFieldModel;
                $crate::entity_model!(@count $( $field ),*)
            ] = [ $( $field, )* ];
            const MODEL_DEF: $crate::model::entity::EntityModel =
                $crate::model::entity::EntityModel {
                    path: $path,
                    entity_name: $entity_name,
                    primary_key: $primary_key,
                    fields: &Self::FIELD_MODELS,
                    parent: $crate::entity_model!(@parent $( $parent )?),
                };
        }

        impl $crate::traits::Path for $name {
            const PATH: &'static str = $path;
        }

        impl $crate::traits::EntityKind for $name {
            const ENTITY_NAME: &'static str = $entity_name;
            const PRIMARY_KEY: &'static str = $primary_key;
            const MODEL: &'static $crate::model::entity::EntityModel = &Self::MODEL_DEF;
        }
    };
    (@parent) => {
        None
    };
    (@parent $parent:ty) => {
        Some(<$parent as $crate::traits::EntityKind>::MODEL)
    };
    (@count $( $value:expr ),* ) => {
        <[()]>::len(&[ $( $crate::entity_model!(@unit $value) ),* ])
    };
    (@unit $value:expr) => {
        ()
    };
}

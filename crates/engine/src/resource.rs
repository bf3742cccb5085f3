//! The entity seam: anything exposed as a JSON:API resource implements
//! [`Resource`], usually via the [`impl_resource!`] macro.

use std::any::Any;

/// A typed entity that can be registered as a JSON:API resource.
///
/// Implementations are plain data structs; all attribute and relationship
/// access goes through the accessor tables registered on the entity's
/// descriptor, never through the trait itself.
pub trait Resource: Any + Send + Sync {
    /// The stable identifier serialized as the resource `id`.
    fn resource_id(&self) -> String;

    fn clone_resource(&self) -> Box<dyn Resource>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Resource> {
    fn clone(&self) -> Self {
        self.clone_resource()
    }
}

impl std::fmt::Debug for Box<dyn Resource> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resource(id = {})", self.resource_id())
    }
}

/// Implement [`Resource`] for a `Clone` entity struct, naming the id field.
///
/// Usage:
/// ```ignore
/// #[derive(Clone)]
/// struct User { id: String, username: String }
/// impl_resource!(User, id);
/// ```
#[macro_export]
macro_rules! impl_resource {
    ($entity:ty, $id:ident) => {
        impl $crate::resource::Resource for $entity {
            fn resource_id(&self) -> String {
                self.$id.to_string()
            }

            fn clone_resource(&self) -> Box<dyn $crate::resource::Resource> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }
        }
    };
}

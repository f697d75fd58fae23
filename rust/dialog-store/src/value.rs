//! Type-erased storage for values whose concrete class is resolved at
//! decode time via a `__class` tag (spec §4.2, §4.3 rule 6, §9 "Polymorphism
//! tag").

use std::any::Any;
use std::fmt::Debug;

/// A value that can be stored behind a `Box<dyn DynValue>` and later
/// downcast back to its concrete type.
///
/// Every type that is `Any + Clone + Debug + Send + Sync` implements this
/// automatically; most domain records need do nothing to participate in the
/// polymorphic decode path.
pub trait DynValue: Any + Debug + Send + Sync {
    /// Erases this value to `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Erases this value to `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Clones this value behind a fresh box.
    fn clone_boxed(&self) -> Box<dyn DynValue>;
}

impl<T> DynValue for T
where
    T: Any + Clone + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn DynValue> {
    fn clone(&self) -> Self {
        self.as_ref().clone_boxed()
    }
}

impl dyn DynValue {
    /// Downcasts to `&T`, returning `None` on a type mismatch.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcasts to `&mut T`, returning `None` on a type mismatch.
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn it_round_trips_through_type_erasure() {
        let boxed: Box<dyn DynValue> = Box::new(Point { x: 1, y: 2 });
        let point = boxed.downcast_ref::<Point>().unwrap();
        assert_eq!(point, &Point { x: 1, y: 2 });
    }

    #[test]
    fn it_clones_an_erased_value() {
        let boxed: Box<dyn DynValue> = Box::new(Point { x: 1, y: 2 });
        let cloned = boxed.clone();
        assert_eq!(
            cloned.downcast_ref::<Point>(),
            boxed.downcast_ref::<Point>()
        );
    }

    #[test]
    fn it_fails_to_downcast_to_the_wrong_type() {
        let boxed: Box<dyn DynValue> = Box::new(Point { x: 1, y: 2 });
        assert!(boxed.downcast_ref::<i32>().is_none());
    }
}

use std::any::TypeId;
use std::cell::RefMut;

use log::trace;

use crate::context::Context;
use crate::error::SimError;
use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, SeedableRng};
use crate::random::{RngHolder, RngId, RngPlugin};

/// Gets a mutable reference to the random number generator associated with the given
/// [`RngId`]. If the Rng has not been used before, one will be created with the base seed
/// you defined in `init_random`.
fn get_rng<R: RngId + 'static>(context: &Context) -> Result<RefMut<'_, R::RngType>, SimError> {
    let data_container = context
        .get_data_container(RngPlugin)
        .ok_or_else(|| SimError::from("random module has not been initialized"))?;

    let rng_holders = data_container
        .rng_holders
        .try_borrow_mut()
        .map_err(|_| SimError::from("rng streams are already borrowed"))?;
    RefMut::filter_map(rng_holders, |holders| {
        holders
            .entry(TypeId::of::<R>())
            // Create a new rng holder if it doesn't exist yet
            .or_insert_with(|| {
                trace!(
                    "creating new RNG (seed={}) for {}",
                    data_container.base_seed,
                    R::get_name()
                );
                let base_seed = data_container.base_seed;
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
    })
    .map_err(|_| SimError::from("rng stream has an unexpected type"))
}

// This is a trait extension on Context for
// random number generation functionality.
pub trait ContextRandomExt {
    /// Initializes the `RngPlugin` data container to store rngs as well as a base
    /// seed. Note that rngs are created lazily when they are first sampled.
    fn init_random(&mut self, base_seed: u64);

    /// Returns the base seed the streams were derived from.
    ///
    /// # Errors
    ///
    /// Fails if `init_random` was never called.
    fn get_base_seed(&self) -> Result<u64, SimError>;

    /// Gets a random sample from the random number generator associated with the given
    /// [`RngId`] by applying the specified sampler function.
    ///
    /// # Errors
    ///
    /// Fails if `init_random` was never called.
    fn sample<R: RngId + 'static, T>(
        &self,
        rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> Result<T, SimError>;

    /// Gets a random sample within the range provided by `range`
    /// using the generator associated with the given [`RngId`].
    ///
    /// # Errors
    ///
    /// Fails if `init_random` was never called.
    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> Result<T, SimError>
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Gets a uniform sample from `[0, 1)`.
    ///
    /// # Errors
    ///
    /// Fails if `init_random` was never called.
    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> Result<f64, SimError>
    where
        R::RngType: Rng;

    /// Gets a random boolean value which is true with probability `p`
    /// using the generator associated with the given [`RngId`].
    ///
    /// # Errors
    ///
    /// Fails if `init_random` was never called or `p` is not in `[0, 1]`.
    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> Result<bool, SimError>
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module");
        let data_container = self.get_data_container_mut(RngPlugin);
        data_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when they are next sampled
        data_container.rng_holders.get_mut().clear();
    }

    fn get_base_seed(&self) -> Result<u64, SimError> {
        Ok(self.get_data(RngPlugin)?.base_seed)
    }

    fn sample<R: RngId + 'static, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> Result<T, SimError> {
        let mut rng = get_rng::<R>(self)?;
        Ok(sampler(&mut rng))
    }

    fn sample_range<R: RngId + 'static, S, T>(&self, rng_id: R, range: S) -> Result<T, SimError>
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_uniform<R: RngId + 'static>(&self, rng_id: R) -> Result<f64, SimError>
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }

    fn sample_bool<R: RngId + 'static>(&self, rng_id: R, p: f64) -> Result<bool, SimError>
    where
        R::RngType: Rng,
    {
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::from(format!("invalid probability {p}")));
        }
        self.sample(rng_id, |rng| rng.random_bool(p))
    }
}

#[cfg(test)]
mod test {
    use crate::context::Context;
    use crate::define_rng;
    use crate::rand::RngCore;
    use crate::random::context_ext::ContextRandomExt;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64).unwrap(),
            context.sample(FooRng, RngCore::next_u64).unwrap()
        );
    }

    #[test]
    fn uninitialized_random_is_an_error() {
        let context = Context::new();
        assert!(context.sample(FooRng, RngCore::next_u64).is_err());
        assert!(context.get_base_seed().is_err());
    }

    #[test]
    fn multiple_rng_types() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample(FooRng, RngCore::next_u64).unwrap(),
            context.sample(BarRng, RngCore::next_u64).unwrap()
        );
    }

    #[test]
    fn reset_seed() {
        let mut context = Context::new();
        context.init_random(42);
        assert_eq!(context.get_base_seed().unwrap(), 42);

        let run_0 = context.sample(FooRng, RngCore::next_u64).unwrap();
        let run_1 = context.sample(FooRng, RngCore::next_u64).unwrap();

        // Reset with same seed, ensure we get the same values
        context.init_random(42);
        assert_eq!(run_0, context.sample(FooRng, RngCore::next_u64).unwrap());
        assert_eq!(run_1, context.sample(FooRng, RngCore::next_u64).unwrap());

        // Reset with different seed, ensure we get different values
        context.init_random(88);
        assert_ne!(run_0, context.sample(FooRng, RngCore::next_u64).unwrap());
        assert_ne!(run_1, context.sample(FooRng, RngCore::next_u64).unwrap());
    }

    #[test]
    fn sample_range() {
        let mut context = Context::new();
        context.init_random(42);
        let result = context.sample_range(FooRng, 0..10).unwrap();
        assert!((0..10).contains(&result));
    }

    #[test]
    fn sample_uniform() {
        let mut context = Context::new();
        context.init_random(42);
        for _ in 0..1000 {
            let u = context.sample_uniform(FooRng).unwrap();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn sample_bool() {
        let mut context = Context::new();
        context.init_random(42);
        assert!(context.sample_bool(FooRng, 1.0).unwrap());
        assert!(!context.sample_bool(FooRng, 0.0).unwrap());
        assert!(context.sample_bool(FooRng, 1.5).is_err());
    }
}

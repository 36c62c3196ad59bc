use std::fmt;
use std::ptr;

/// Types a rule set validates over.
///
/// Producers and checks are plain function pointers, so the per-item context
/// is a generic associated type that borrows from the document being walked.
pub trait ContextFamily: 'static {
    /// Root document handed to [`run`].
    type Document: ?Sized + 'static;
    /// Schema carried alongside the document, when the caller has one.
    type Schema: ?Sized + 'static;
    /// Per-item context record yielded by producers.
    type Item<'a>;
    /// Error raised by a failing check.
    type Error;
}

/// Global context handed to every producer: the whole document plus,
/// optionally, its schema.
pub struct GlobalContext<'a, F: ContextFamily> {
    pub document: &'a F::Document,
    pub schema: Option<&'a F::Schema>,
}

impl<F: ContextFamily> Clone for GlobalContext<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ContextFamily> Copy for GlobalContext<'_, F> {}

/// Lazy sequence of item contexts.
pub type ItemIter<'a, F> = Box<dyn Iterator<Item = <F as ContextFamily>::Item<'a>> + 'a>;

/// Function deriving item contexts from the global context.
pub type ProduceFn<F> = for<'a> fn(GlobalContext<'a, F>) -> ItemIter<'a, F>;

/// Function checking a single item context.
pub type CheckFn<F> = for<'a, 'b> fn(
    &'b <F as ContextFamily>::Item<'a>,
) -> Result<(), <F as ContextFamily>::Error>;

/// A named context producer.
///
/// Producers are compared by address, never by behaviour: declare each one
/// as a `static` and hand out `&'static` references to it. Two statics
/// wrapping the same function are still two distinct producers.
pub struct ContextProducer<F: ContextFamily> {
    name: &'static str,
    produce: ProduceFn<F>,
}

impl<F: ContextFamily> ContextProducer<F> {
    pub const fn new(name: &'static str, produce: ProduceFn<F>) -> Self {
        Self { name, produce }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start walking the scope described by this producer.
    pub fn produce<'a>(&self, global: GlobalContext<'a, F>) -> ItemIter<'a, F> {
        (self.produce)(global)
    }
}

impl<F: ContextFamily> fmt::Debug for ContextProducer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProducer")
            .field("name", &self.name)
            .finish()
    }
}

/// A named check function.
pub struct Check<F: ContextFamily> {
    name: &'static str,
    run: CheckFn<F>,
}

impl<F: ContextFamily> Check<F> {
    pub fn new(name: &'static str, run: CheckFn<F>) -> Self {
        Self { name, run }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, item: &F::Item<'_>) -> Result<(), F::Error> {
        (self.run)(item)
    }
}

impl<F: ContextFamily> Clone for Check<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ContextFamily> Copy for Check<F> {}

/// A context producer paired with the checks run against each item it yields.
pub struct Validator<F: ContextFamily> {
    producer: &'static ContextProducer<F>,
    checks: Vec<Check<F>>,
}

impl<F: ContextFamily> Validator<F> {
    /// Declare a single check run in the scope of `producer`.
    pub fn define(
        producer: &'static ContextProducer<F>,
        name: &'static str,
        check: CheckFn<F>,
    ) -> Self {
        Self {
            producer,
            checks: vec![Check::new(name, check)],
        }
    }

    pub fn producer(&self) -> &'static ContextProducer<F> {
        self.producer
    }

    /// Check names in execution order.
    pub fn check_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.iter().map(Check::name)
    }

    /// Returns true when `producer` is the very same producer value.
    pub fn uses_producer(&self, producer: &ContextProducer<F>) -> bool {
        ptr::eq(self.producer, producer)
    }

    /// Run every check against every item, stopping at the first failure.
    pub fn validate(&self, global: GlobalContext<'_, F>) -> Result<(), F::Error> {
        for item in self.producer.produce(global) {
            for check in &self.checks {
                if let Err(err) = check.call(&item) {
                    tracing::debug!(
                        event = "check_failed",
                        producer = self.producer.name,
                        check = check.name
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

impl<F: ContextFamily> Clone for Validator<F> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer,
            checks: self.checks.clone(),
        }
    }
}

impl<F: ContextFamily> fmt::Debug for Validator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("producer", &self.producer.name)
            .field("checks", &self.check_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Build one validator running every input validator's checks, in input
/// order, under `producer`. The inputs' own producers are ignored.
pub fn compose<F: ContextFamily>(
    producer: &'static ContextProducer<F>,
    validators: impl IntoIterator<Item = Validator<F>>,
) -> Validator<F> {
    let checks = validators
        .into_iter()
        .flat_map(|validator| validator.checks)
        .collect();
    Validator { producer, checks }
}

/// Compose validators sharing a producer into one validator per producer.
///
/// Groups appear in the order their producer was first seen; checks inside
/// a group keep their declaration order.
pub fn group_by_context<F: ContextFamily>(validators: Vec<Validator<F>>) -> Vec<Validator<F>> {
    if validators.len() <= 1 {
        return validators;
    }

    let mut groups: Vec<(&'static ContextProducer<F>, Vec<Validator<F>>)> = Vec::new();
    for validator in validators {
        let producer = validator.producer;
        match groups
            .iter()
            .position(|(seen, _)| ptr::eq(*seen, producer))
        {
            Some(idx) => groups[idx].1.push(validator),
            None => groups.push((producer, vec![validator])),
        }
    }

    tracing::debug!(event = "validators_grouped", groups = groups.len());

    groups
        .into_iter()
        .map(|(producer, group)| compose(producer, group))
        .collect()
}

/// Concatenate validator registries, keeping each registry's order.
pub fn collect<F: ContextFamily>(
    registries: impl IntoIterator<Item = Vec<Validator<F>>>,
) -> Vec<Validator<F>> {
    registries.into_iter().flatten().collect()
}

/// Run validators in order against `document`, returning the first failure.
pub fn run<F: ContextFamily>(
    validators: &[Validator<F>],
    document: &F::Document,
    schema: Option<&F::Schema>,
) -> Result<(), F::Error> {
    for validator in validators {
        let global = GlobalContext { document, schema };
        validator.validate(global)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Numbers;

    impl ContextFamily for Numbers {
        type Document = [i64];
        type Schema = ();
        type Item<'a> = &'a i64;
        type Error = String;
    }

    thread_local! {
        static CALLS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn record(check: &str, item: i64) {
        CALLS.with(|calls| calls.borrow_mut().push(format!("{check}:{item}")));
    }

    fn take_calls() -> Vec<String> {
        CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
    }

    fn each_number<'a>(global: GlobalContext<'a, Numbers>) -> ItemIter<'a, Numbers> {
        Box::new(global.document.iter())
    }

    fn each_even<'a>(global: GlobalContext<'a, Numbers>) -> ItemIter<'a, Numbers> {
        Box::new(global.document.iter().filter(|n| **n % 2 == 0))
    }

    static EACH_NUMBER: ContextProducer<Numbers> =
        ContextProducer::<Numbers>::new("each_number", each_number);
    static EACH_NUMBER_AGAIN: ContextProducer<Numbers> =
        ContextProducer::<Numbers>::new("each_number", each_number);
    static EACH_EVEN: ContextProducer<Numbers> =
        ContextProducer::<Numbers>::new("each_even", each_even);

    fn first(item: &&i64) -> Result<(), String> {
        record("first", **item);
        Ok(())
    }

    fn second(item: &&i64) -> Result<(), String> {
        record("second", **item);
        Ok(())
    }

    fn third(item: &&i64) -> Result<(), String> {
        record("third", **item);
        Ok(())
    }

    fn below_three(item: &&i64) -> Result<(), String> {
        record("below_three", **item);
        if **item >= 3 {
            return Err(format!("{item} is not below three"));
        }
        Ok(())
    }

    #[test]
    fn grouping_keeps_first_seen_order_and_declaration_order() {
        let validators = vec![
            Validator::<Numbers>::define(&EACH_EVEN, "first", first),
            Validator::<Numbers>::define(&EACH_NUMBER, "second", second),
            Validator::<Numbers>::define(&EACH_EVEN, "third", third),
        ];

        let grouped = group_by_context(validators);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[0].uses_producer(&EACH_EVEN));
        assert_eq!(grouped[0].check_names().collect::<Vec<_>>(), ["first", "third"]);
        assert!(grouped[1].uses_producer(&EACH_NUMBER));
        assert_eq!(grouped[1].check_names().collect::<Vec<_>>(), ["second"]);
    }

    #[test]
    fn grouped_run_matches_individual_runs() {
        let document = [1, 2, 3];
        let validators = vec![
            Validator::<Numbers>::define(&EACH_NUMBER, "first", first),
            Validator::<Numbers>::define(&EACH_NUMBER, "second", second),
        ];

        take_calls();
        for validator in &validators {
            run(std::slice::from_ref(validator), &document[..], None).expect("run individually");
        }
        let individual = take_calls();

        let grouped = group_by_context(validators);
        run(&grouped, &document[..], None).expect("run grouped");
        let composed = take_calls();

        let mut individual_sorted = individual.clone();
        individual_sorted.sort();
        let mut composed_sorted = composed.clone();
        composed_sorted.sort();
        assert_eq!(individual_sorted, composed_sorted);
        assert_eq!(
            composed,
            ["first:1", "second:1", "first:2", "second:2", "first:3", "second:3"]
        );
    }

    #[test]
    fn distinct_producers_are_not_merged() {
        let validators = vec![
            Validator::<Numbers>::define(&EACH_NUMBER, "first", first),
            Validator::<Numbers>::define(&EACH_NUMBER_AGAIN, "second", second),
        ];

        let grouped = group_by_context(validators);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[1].uses_producer(&EACH_NUMBER_AGAIN));
        assert!(!grouped[1].uses_producer(&EACH_NUMBER));
    }

    #[test]
    fn short_lists_are_returned_unchanged() {
        assert!(group_by_context::<Numbers>(Vec::new()).is_empty());

        let single = group_by_context(vec![Validator::<Numbers>::define(
            &EACH_EVEN, "first", first,
        )]);
        assert_eq!(single.len(), 1);
        assert!(single[0].uses_producer(&EACH_EVEN));
    }

    #[test]
    fn run_stops_at_first_failure() {
        let document = [1, 3, 5];
        let validators = vec![
            Validator::<Numbers>::define(&EACH_NUMBER, "below_three", below_three),
            Validator::<Numbers>::define(&EACH_NUMBER, "first", first),
        ];

        take_calls();
        let err = run(&validators, &document[..], None).expect_err("3 should fail");
        assert_eq!(err, "3 is not below three");
        assert_eq!(take_calls(), ["below_three:1", "below_three:3"]);
    }

    #[test]
    fn compose_replaces_input_producers() {
        let document = [1, 2, 3, 4];
        let composed = compose(
            &EACH_EVEN,
            vec![
                Validator::<Numbers>::define(&EACH_NUMBER, "first", first),
                Validator::<Numbers>::define(&EACH_NUMBER_AGAIN, "second", second),
            ],
        );

        take_calls();
        run(&[composed], &document[..], None).expect("composed run");
        assert_eq!(take_calls(), ["first:2", "second:2", "first:4", "second:4"]);
    }

    #[test]
    fn collect_concatenates_registries_in_order() {
        let collected = collect(vec![
            vec![Validator::<Numbers>::define(&EACH_NUMBER, "first", first)],
            vec![
                Validator::<Numbers>::define(&EACH_EVEN, "second", second),
                Validator::<Numbers>::define(&EACH_NUMBER, "third", third),
            ],
        ]);

        let names: Vec<_> = collected
            .iter()
            .flat_map(|validator| validator.check_names())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }
}

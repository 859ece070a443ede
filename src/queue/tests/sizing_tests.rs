//! Tests for batch width selection.

use crate::provider::domain::ProviderFamily;
use crate::queue::batch_size_for;
use rstest::rstest;

#[rstest]
#[case(0, ProviderFamily::Image, 1)]
#[case(3, ProviderFamily::Image, 3)]
#[case(20, ProviderFamily::Image, 5)]
#[case(21, ProviderFamily::Image, 2)]
#[case(2, ProviderFamily::Video, 2)]
#[case(6, ProviderFamily::Video, 2)]
#[case(7, ProviderFamily::Video, 1)]
#[case(4, ProviderFamily::Training, 1)]
fn width_depends_on_count_and_family(
    #[case] count: usize,
    #[case] family: ProviderFamily,
    #[case] expected: usize,
) {
    assert_eq!(batch_size_for(count, family), expected);
}

use mosaic_derive::mosaic_service;

#[mosaic_service]
pub struct PriceBook {
    currency: String,
    entries: Vec<(u64, u64)>,
}

impl PriceBook {
    fn price_of(&self, product_id: u64) -> Option<u64> {
        self.entries.iter().find(|(id, _)| *id == product_id).map(|(_, amount)| *amount)
    }
}

fn main() {
    let book = PriceBook::new(PriceBookInner { currency: "EUR".to_owned(), entries: vec![(10, 800)] });
    let shared = book.clone();

    assert_eq!(shared.currency, "EUR");
    assert_eq!(shared.price_of(10), Some(800));
    assert_eq!(book.handle_count(), 2);

    let from_inner: PriceBook = PriceBookInner { currency: "USD".to_owned(), entries: Vec::new() }.into();
    assert_eq!(from_inner.price_of(10), None);
}

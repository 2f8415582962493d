//! # Table Lifecycle
//!
//! A [`Table`] binds a [`Pager`] to the fixed root page. Opening an empty
//! database initializes page 0 as an empty root leaf; opening an existing
//! file picks up whatever tree the pages describe. Closing flushes every
//! cached page and is the only durability boundary: buffered writes that
//! never reach [`Table::close`] are lost.

use std::path::Path;

use eyre::Result;

use crate::btree::{BTree, InsertOutcome, LeafNodeMut};
use crate::row::{Row, ROW_SIZE};
use crate::storage::Pager;

pub struct Table {
    pager: Pager,
    root_page_num: u32,
}

impl Table {
    /// Opens or creates the database file and ensures page 0 holds the root.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(path)?;

        if pager.num_pages() == 0 {
            // New database file: page 0 becomes an empty root leaf.
            let page = pager.get_page(0)?;
            let mut root = LeafNodeMut::init(&mut page[..])?;
            root.set_is_root(true);
        }

        Ok(Self {
            pager,
            root_page_num: 0,
        })
    }

    /// Flushes every cached page and syncs the backing file.
    pub fn close(&mut self) -> Result<()> {
        self.pager.close()
    }

    pub fn insert(&mut self, row: &Row) -> Result<InsertOutcome> {
        let mut value = [0u8; ROW_SIZE];
        row.serialize(&mut value)?;
        self.btree().insert(row.id, &value)
    }

    /// All rows in ascending id order.
    pub fn select(&mut self) -> Result<Vec<Row>> {
        let mut tree = BTree::new(&mut self.pager, self.root_page_num);
        let mut cursor = tree.start()?;

        let mut rows = Vec::new();
        while !cursor.end_of_table {
            rows.push(Row::deserialize(tree.value(&cursor)?)?);
            tree.advance(&mut cursor)?;
        }

        Ok(rows)
    }

    pub fn btree(&mut self) -> BTree<'_> {
        BTree::new(&mut self.pager, self.root_page_num)
    }

    pub fn pager(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn root_page_num(&self) -> u32 {
        self.root_page_num
    }
}
